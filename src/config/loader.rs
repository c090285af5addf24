// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles loading configuration from JSON and YAML files in various
//! locations.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AgentConfig;

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[".beacon.json", ".beacon/config.json", "beacon.config.json"];

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".beacon";

/// Global config file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Get the global config file path.
pub fn get_global_config_path() -> Option<PathBuf> {
    get_global_config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
}

/// Load global configuration from ~/.beacon/config.json.
pub fn load_global_config() -> Result<Option<AgentConfig>, ConfigError> {
    let path = match get_global_config_path() {
        Some(p) => p,
        None => return Ok(None),
    };

    if !path.exists() {
        return Ok(None);
    }

    load_config_file(&path).map(Some)
}

/// Load configuration from an application root.
///
/// Searches for config files in the following order:
/// 1. .beacon.json
/// 2. .beacon/config.json
/// 3. beacon.config.json
pub fn load_root_config(root: &Path) -> Result<Option<AgentConfig>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = root.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

/// Save configuration to a file under an application root.
pub fn save_config(
    root: &Path,
    config: &AgentConfig,
    filename: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let filename = filename.unwrap_or(".beacon.json");
    let path = root.join(filename);

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_files_order() {
        assert_eq!(CONFIG_FILES.len(), 3);
        assert_eq!(CONFIG_FILES[0], ".beacon.json");
    }

    #[test]
    fn test_global_config_dir() {
        let dir = get_global_config_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().ends_with(".beacon"));
    }

    #[test]
    fn test_load_root_config_not_found() {
        let temp = TempDir::new().unwrap();
        let result = load_root_config(temp.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_root_config_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".beacon.json"),
            r#"{"session": {"inactivityTimeoutSecs": 90}}"#,
        )
        .unwrap();

        let config = load_root_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.session.inactivity_timeout_secs, 90);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.upload.max_attempts, 5);
    }

    #[test]
    fn test_load_config_file_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("beacon.yaml");
        std::fs::write(&path, "storage:\n  maxBytes: 1024\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.storage.max_bytes, 1024);
    }

    #[test]
    fn test_load_config_file_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".beacon.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_save_config() {
        let temp = TempDir::new().unwrap();
        let config = AgentConfig::default();

        let path = save_config(temp.path(), &config, None).unwrap();
        assert!(path.exists());

        let loaded = load_config_file(&path).unwrap();
        assert_eq!(loaded.storage.max_bytes, config.storage.max_bytes);
    }
}
