// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Durable record buffering.
//!
//! Persists every produced record as an immutable file before any network
//! attempt. A file's presence under its final name is the sole source of
//! truth for "this record is not yet confirmed delivered".

use std::path::PathBuf;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use tokio::io::AsyncWriteExt;

use crate::error::BufferError;
use crate::idgen;
use crate::quota::QuotaTracker;
use crate::types::{RecordId, RecordKind};

#[cfg(feature = "metrics")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Prefix of in-progress temp files; never visible as a buffered record.
const TMP_PREFIX: char = '.';

/// Durable on-disk buffer of undelivered records.
pub struct RecordBuffer {
    root: PathBuf,
    quota: Arc<QuotaTracker>,
}

impl RecordBuffer {
    /// Create a buffer rooted at `root` with quota enforcement.
    pub fn new(root: impl Into<PathBuf>, quota: Arc<QuotaTracker>) -> Self {
        Self {
            root: root.into(),
            quota,
        }
    }

    /// The buffer root directory.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Directory holding buffered files of `kind`.
    pub fn kind_dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path of the buffered file for a record.
    pub fn record_path(&self, kind: RecordKind, record_id: &str) -> PathBuf {
        self.kind_dir(kind).join(record_id)
    }

    /// Durably persist a record, returning its fresh id.
    ///
    /// The payload is written under a temp name, flushed, and renamed into
    /// place, so a file that exists under its final name is always
    /// complete. A failed write drops the record: no file, no job.
    pub async fn store(&self, kind: RecordKind, payload: &[u8]) -> Result<RecordId, BufferError> {
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        // A record larger than the whole region can never fit, evicted or not.
        if payload.len() as u64 > self.quota.policy().max_bytes {
            return Err(BufferError::QuotaExceeded(format!(
                "record of {} bytes exceeds the {} byte region cap",
                payload.len(),
                self.quota.policy().max_bytes
            )));
        }

        let dir = self.kind_dir(kind);
        tokio::fs::create_dir_all(&dir).await?;

        if self.quota.should_evict().await? {
            let freed = self.quota.evict_to_fit().await?;
            tracing::warn!(bytes = freed, "storage over bound, evicted oldest records");
        }

        let record_id = idgen::record_id();

        let tmp_path = dir.join(format!("{}{}.tmp", TMP_PREFIX, record_id));
        let final_path = dir.join(&record_id);

        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(payload).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &final_path).await?;

        tracing::debug!(
            kind = %kind,
            record_id = %record_id,
            bytes = payload.len(),
            "buffered record"
        );

        #[cfg(feature = "metrics")]
        GLOBAL_METRICS.record_operation("buffer.store", start.elapsed());

        Ok(record_id)
    }

    /// Read a buffered record's payload.
    pub async fn read(&self, kind: RecordKind, record_id: &str) -> Result<Vec<u8>, BufferError> {
        Ok(tokio::fs::read(self.record_path(kind, record_id)).await?)
    }

    /// Delete a buffered record. A missing file is not an error: the record
    /// is gone either way.
    pub async fn remove(&self, kind: RecordKind, record_id: &str) -> Result<(), BufferError> {
        match tokio::fs::remove_file(self.record_path(kind, record_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List buffered record ids of `kind`. Temp files are invisible.
    pub async fn list(&self, kind: RecordKind) -> Result<Vec<RecordId>, BufferError> {
        let dir = self.kind_dir(kind);
        let mut ids = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(TMP_PREFIX) {
                continue;
            }
            if entry.file_type().await?.is_file() {
                ids.push(name.to_string());
            }
        }

        Ok(ids)
    }

    /// Remove leftover temp files from interrupted writes.
    pub async fn sweep_temp_files(&self) -> Result<usize, BufferError> {
        let mut removed = 0usize;

        for kind in RecordKind::ALL {
            let dir = self.kind_dir(kind);
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if name.starts_with(TMP_PREFIX) && tokio::fs::remove_file(entry.path()).await.is_ok()
                {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "swept interrupted temp files");
        }
        Ok(removed)
    }
}
