// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Background upload pipeline.
//!
//! Moves buffered records to the collector exactly once per pending
//! attempt:
//!
//! ```text
//! RecordBuffer.store ──▶ UploadCoordinator.schedule ──▶ JobScheduler
//!        │                        │                         │
//!   file on disk          RecordId → JobId map         deferred task
//!        │                        │                         │
//!        └────────── deleted on delivery ◀── deliver ◀──────┘
//! ```
//!
//! The invariant throughout: at most one live job per record. Scheduling a
//! record that already has a job cancels the old one first;
//! [`OfflineRecoveryScanner`] applies the same rule when resubmitting
//! records that survived a process death.

mod coordinator;
mod exporter;
mod recovery;
mod scheduler;

pub use coordinator::UploadCoordinator;
pub use exporter::Exporter;
pub use recovery::OfflineRecoveryScanner;
pub use scheduler::{JobOutcome, JobRunner, JobScheduler, SchedulerConfig, TokioJobScheduler};
