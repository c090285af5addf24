// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the beacon telemetry agent.
//!
//! This module provides strongly-typed errors for each part of the pipeline,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error
//! propagation at the top level.

use thiserror::Error;

/// Errors from identifier generation.
#[derive(Error, Debug)]
pub enum IdentifierError {
    #[error("Invalid identifier length: {0}")]
    InvalidLength(usize),
}

/// Errors from the durable record buffer.
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

/// Errors from the job/identity store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    OpenFailed(String),

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Errors reported by an exporter implementation.
///
/// The pipeline treats every export failure as transient: the buffered file
/// stays on disk and the job retries. Variants exist so implementations can
/// log meaningfully, not to steer retry policy.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Collector rejected payload: {0}")]
    Rejected(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

/// Errors from the upload pipeline.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let buf_err: BufferError = io_err.into();
        assert!(matches!(buf_err, BufferError::NotFound(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let buf_err: BufferError = io_err.into();
        assert!(matches!(buf_err, BufferError::PermissionDenied(_)));
    }

    #[test]
    fn test_upload_error_from_store() {
        let store_err = StoreError::QueryFailed("bad sql".to_string());
        let upload_err: UploadError = store_err.into();
        assert!(matches!(upload_err, UploadError::Store(_)));
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("not json");
        let json_err = result.unwrap_err();
        let config_err: ConfigError = json_err.into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = BufferError::QuotaExceeded("record of 100 bytes exceeds cap".to_string());
        let display = format!("{}", err);
        assert!(display.contains("quota"));
        assert!(display.contains("100 bytes"));
    }
}
