// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the agent configuration structure, supporting JSON and YAML
//! formats. Every field has a default so a partial file (or no file at
//! all) yields a working configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level agent configuration.
///
/// Can be defined in `.beacon.json` or `.beacon/config.json` next to the
/// host application, or constructed directly when embedding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Directory holding buffered records and the agent database.
    /// Defaults to `~/.beacon` when unset.
    pub data_dir: Option<PathBuf>,

    /// Session lifecycle settings.
    pub session: SessionSettings,

    /// Storage quota settings.
    pub storage: StorageSettings,

    /// Upload scheduling settings.
    pub upload: UploadSettings,
}

impl AgentConfig {
    /// Resolve the data directory, falling back to `~/.beacon`.
    pub fn resolve_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".beacon")))
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.session.sampling_rate) {
            return Err(ConfigError::InvalidValue {
                field: "session.samplingRate".to_string(),
                message: format!("must be within 0.0..=1.0, got {}", self.session.sampling_rate),
            });
        }
        if self.storage.max_percent_of_free > 100 {
            return Err(ConfigError::InvalidValue {
                field: "storage.maxPercentOfFree".to_string(),
                message: format!("must be <= 100, got {}", self.storage.max_percent_of_free),
            });
        }
        if self.storage.max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.maxBytes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.session.pulse_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.pulseIntervalSecs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Session lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Seconds of inactivity after which the next activity signal rotates
    /// the session.
    pub inactivity_timeout_secs: u64,

    /// Seconds between keep-alive pulse notifications.
    pub pulse_interval_secs: u64,

    /// Fraction of sessions sampled, 0.0..=1.0.
    pub sampling_rate: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 120,
            pulse_interval_secs: 60,
            sampling_rate: 1.0,
        }
    }
}

impl SessionSettings {
    /// Inactivity timeout as a duration.
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    /// Pulse interval as a duration.
    pub fn pulse_interval(&self) -> Duration {
        Duration::from_secs(self.pulse_interval_secs)
    }
}

/// Storage quota settings for the buffer region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Maximum bytes the buffer region may occupy.
    pub max_bytes: u64,

    /// Maximum occupied space as a percentage of free disk space.
    pub max_percent_of_free: u8,

    /// Minimum free disk space to preserve on the underlying volume.
    pub min_free_bytes: u64,

    /// Seconds a cached directory-size reading stays fresh.
    pub size_cache_ttl_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024 * 1024,
            max_percent_of_free: 5,
            min_free_bytes: 50 * 1024 * 1024,
            size_cache_ttl_secs: 30,
        }
    }
}

impl StorageSettings {
    /// Size-cache staleness window as a duration.
    pub fn size_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.size_cache_ttl_secs)
    }
}

/// Upload scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadSettings {
    /// Seconds before the first delivery attempt of a scheduled job.
    pub initial_delay_secs: u64,

    /// Seconds between retry attempts of a failed delivery.
    pub retry_delay_secs: u64,

    /// Delivery attempts before a job gives up for this process lifetime.
    pub max_attempts: u32,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 2,
            retry_delay_secs: 60,
            max_attempts: 5,
        }
    }
}

impl UploadSettings {
    /// Initial delay as a duration.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    /// Retry delay as a duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.session.inactivity_timeout_secs, 120);
        assert_eq!(config.session.sampling_rate, 1.0);
        assert_eq!(config.storage.max_bytes, 64 * 1024 * 1024);
        assert_eq!(config.storage.size_cache_ttl_secs, 30);
        assert_eq!(config.upload.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"session": {"samplingRate": 0.25}}"#).unwrap();
        assert_eq!(config.session.sampling_rate, 0.25);
        assert_eq!(config.session.inactivity_timeout_secs, 120);
        assert_eq!(config.storage.max_percent_of_free, 5);
    }

    #[test]
    fn test_validate_sampling_rate() {
        let mut config = AgentConfig::default();
        config.session.sampling_rate = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_percent_bound() {
        let mut config = AgentConfig::default();
        config.storage.max_percent_of_free = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_data_dir_explicit() {
        let config = AgentConfig {
            data_dir: Some(PathBuf::from("/tmp/beacon-test")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_dir(),
            Some(PathBuf::from("/tmp/beacon-test"))
        );
    }

    #[test]
    fn test_durations() {
        let settings = SessionSettings::default();
        assert_eq!(settings.inactivity_timeout(), Duration::from_secs(120));
        assert_eq!(settings.pulse_interval(), Duration::from_secs(60));
    }
}
