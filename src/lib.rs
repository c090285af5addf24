// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Beacon - an embedded telemetry agent.
//!
//! Captures observability records (span batches, log batches) produced
//! inside an application process, tags them with a consistent session and
//! user identity, durably buffers them on local storage, and delivers them
//! to a remote collector in the background. No buffered record is lost
//! across process death, and no record ever has more than one upload in
//! flight.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (RecordKind, RecordId, JobSpec, etc.)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and validation
//! - [`idgen`] - Random identifier generation
//! - [`telemetry`] - Tracing setup and internal metrics
//! - [`store`] - SQLite-backed job and identity store
//! - [`quota`] - Storage quota tracking and eviction
//! - [`record`] - Durable record buffering
//! - [`upload`] - Upload coordination, scheduling, and offline recovery
//! - [`session`] - Session lifecycle and anonymous user identity
//! - [`agent`] - Top-level agent context wiring the pipeline together
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon::{AgentConfig, RecordKind, TelemetryAgent};
//!
//! let config = AgentConfig::default();
//! let agent = TelemetryAgent::start(config, exporter).await?;
//!
//! // Producers stamp the current session onto their payloads, then buffer.
//! let session_id = agent.session().session_id();
//! agent.record(RecordKind::Spans, &payload).await?;
//! ```
//!
//! The external collaborators (lifecycle signal sources, instrumentation
//! producing the payloads, and the wire transport) connect through
//! [`SessionController`](session::SessionController),
//! [`TelemetryAgent::record`], and the [`Exporter`](upload::Exporter)
//! trait respectively.

pub mod agent;
pub mod config;
pub mod error;
pub mod idgen;
pub mod quota;
pub mod record;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod upload;

// Re-export commonly used types at crate root
pub use agent::TelemetryAgent;
pub use config::{AgentConfig, SessionSettings, StorageSettings, UploadSettings};
pub use error::{
    BufferError, ConfigError, ExportError, IdentifierError, Result, StoreError, UploadError,
};
pub use quota::{QuotaTracker, StoragePolicy};
pub use record::RecordBuffer;
pub use session::{Session, SessionController, SessionEvent, TrackingMode, UserIdentity};
pub use store::AgentStore;
pub use types::{JobId, JobSpec, RecordId, RecordKind, SessionId};
pub use upload::{
    Exporter, JobOutcome, JobRunner, JobScheduler, OfflineRecoveryScanner, SchedulerConfig,
    TokioJobScheduler, UploadCoordinator,
};

/// Beacon version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        // Verify key types are accessible
        let _config = AgentConfig::default();
        let _spec = JobSpec::new(RecordKind::Spans, "record");
        let _scheduler_config = SchedulerConfig::default();
    }
}
