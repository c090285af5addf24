// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core type definitions shared across the pipeline.

use serde::{Deserialize, Serialize};

/// Unique identifier naming a buffered record file and its upload job.
pub type RecordId = String;

/// Scheduler-assigned handle for a deferred upload task.
pub type JobId = String;

/// Identifier of a bounded span of user activity.
pub type SessionId = String;

/// The kind of telemetry payload a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A batch of distributed-tracing spans.
    Spans,
    /// A batch of structured log records.
    Logs,
}

impl RecordKind {
    /// All record kinds, in buffer-directory order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Spans, RecordKind::Logs];

    /// Name of the buffer directory holding records of this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Spans => "spans",
            Self::Logs => "logs",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A deferred delivery unit handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Kind directory the buffered file lives in.
    pub kind: RecordKind,
    /// Record the job delivers.
    pub record_id: RecordId,
}

impl JobSpec {
    /// Create a job spec for a buffered record.
    pub fn new(kind: RecordKind, record_id: impl Into<RecordId>) -> Self {
        Self {
            kind,
            record_id: record_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_dir_names() {
        assert_eq!(RecordKind::Spans.dir_name(), "spans");
        assert_eq!(RecordKind::Logs.dir_name(), "logs");
        assert_eq!(RecordKind::ALL.len(), 2);
    }

    #[test]
    fn test_record_kind_display() {
        assert_eq!(RecordKind::Spans.to_string(), "spans");
        assert_eq!(RecordKind::Logs.to_string(), "logs");
    }

    #[test]
    fn test_record_kind_serde() {
        let json = serde_json::to_string(&RecordKind::Spans).unwrap();
        assert_eq!(json, "\"spans\"");
        let parsed: RecordKind = serde_json::from_str("\"logs\"").unwrap();
        assert_eq!(parsed, RecordKind::Logs);
    }

    #[test]
    fn test_job_spec_new() {
        let spec = JobSpec::new(RecordKind::Logs, "abc123");
        assert_eq!(spec.kind, RecordKind::Logs);
        assert_eq!(spec.record_id, "abc123");
    }
}
