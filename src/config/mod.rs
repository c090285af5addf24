// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for the agent.
//!
//! Handles loading and validation of configuration from multiple sources:
//! - Root config: .beacon.json, .beacon/config.json, or beacon.config.json
//! - Global config: ~/.beacon/config.json
//! - Built-in defaults
//!
//! The first source found wins (root > global > defaults); fields missing
//! from a file fall back to their defaults via serde.

mod loader;
mod types;

pub use loader::{
    get_global_config_dir, get_global_config_path, load_config_file, load_global_config,
    load_root_config, save_config, CONFIG_FILES, GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_FILE,
};

pub use types::{AgentConfig, SessionSettings, StorageSettings, UploadSettings};

use std::path::Path;

use crate::error::ConfigError;

/// Load and validate configuration for an application root.
pub fn load_config(root: &Path) -> Result<AgentConfig, ConfigError> {
    let config = match load_root_config(root)? {
        Some(config) => config,
        None => load_global_config()?.unwrap_or_default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults_when_absent() {
        let temp = TempDir::new().unwrap();
        // No root config; a global one may exist on the machine, but either
        // way the result must validate.
        let config = load_config(temp.path()).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".beacon.json"),
            r#"{"session": {"samplingRate": 2.0}}"#,
        )
        .unwrap();

        let err = load_config(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
