// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Startup recovery of buffered-but-undelivered records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::UploadError;
use crate::record::RecordBuffer;
use crate::types::RecordKind;

use super::coordinator::UploadCoordinator;

/// Resubmits records that survived a previous process as files on disk.
///
/// This is what makes buffering crash-safe: any record that outlived a
/// process death purely as a file is rescheduled exactly once per process
/// start.
pub struct OfflineRecoveryScanner {
    buffer: Arc<RecordBuffer>,
    coordinator: Arc<UploadCoordinator>,
    started: AtomicBool,
}

impl OfflineRecoveryScanner {
    /// Create a scanner over the buffer and coordinator.
    pub fn new(buffer: Arc<RecordBuffer>, coordinator: Arc<UploadCoordinator>) -> Self {
        Self {
            buffer,
            coordinator,
            started: AtomicBool::new(false),
        }
    }

    /// Scan the buffer directories and reschedule every surviving record.
    ///
    /// Runs at most once per process; a concurrent or repeated call is a
    /// no-op. Job ids persisted by a previous process are canceled before
    /// rescheduling; they are not assumed valid in a fresh scheduler.
    pub async fn recover_all(&self) -> Result<usize, UploadError> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("offline recovery already ran, skipping");
            return Ok(0);
        }

        self.buffer.sweep_temp_files().await?;

        let mut resubmitted = 0usize;
        for kind in RecordKind::ALL {
            for record_id in self.buffer.list(kind).await? {
                self.coordinator.cancel(&record_id).await?;
                self.coordinator.schedule(kind, record_id).await?;
                resubmitted += 1;
            }
        }

        if resubmitted > 0 {
            tracing::info!(resubmitted, "resubmitted offline records");
        }
        Ok(resubmitted)
    }

    /// Whether recovery has run in this process.
    pub fn has_run(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}
