// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Upload coordination.
//!
//! Guarantees at most one live upload job per buffered record: scheduling
//! supersedes any pending job for the same record by canceling it first,
//! and the cancel + map-update + reschedule sequence is serialized so two
//! flows can never interleave on the job map.

use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::UploadError;
use crate::record::RecordBuffer;
use crate::store::AgentStore;
use crate::types::{JobId, JobSpec, RecordId, RecordKind};

use super::exporter::Exporter;
use super::scheduler::{JobOutcome, JobRunner, JobScheduler};

#[cfg(feature = "metrics")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Schedules and executes deferred record deliveries.
pub struct UploadCoordinator {
    buffer: Arc<RecordBuffer>,
    store: Arc<Mutex<AgentStore>>,
    scheduler: Arc<dyn JobScheduler>,
    exporter: Arc<dyn Exporter>,
    /// Serializes cancel + map update + reschedule across callers.
    schedule_lock: Mutex<()>,
}

impl UploadCoordinator {
    /// Create a coordinator over a buffer, job store, scheduler, and
    /// exporter.
    pub fn new(
        buffer: Arc<RecordBuffer>,
        store: Arc<Mutex<AgentStore>>,
        scheduler: Arc<dyn JobScheduler>,
        exporter: Arc<dyn Exporter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            buffer,
            store,
            scheduler,
            exporter,
            schedule_lock: Mutex::new(()),
        })
    }

    /// Schedule delivery of a buffered record.
    ///
    /// Any job already mapped to this record is canceled and its mapping
    /// removed before the fresh job is installed.
    pub async fn schedule(
        &self,
        kind: RecordKind,
        record_id: RecordId,
    ) -> Result<JobId, UploadError> {
        let _serial = self.schedule_lock.lock().await;

        let existing = { self.store.lock().await.get_job(&record_id)? };
        if let Some(stale) = existing {
            self.scheduler.cancel(&stale).await?;
            self.store.lock().await.remove_job(&record_id)?;
            tracing::debug!(
                record_id = %record_id,
                job_id = %stale,
                "superseded pending job"
            );
        }

        let job_id = self
            .scheduler
            .run_deferred(JobSpec::new(kind, record_id.clone()))
            .await?;
        self.store.lock().await.put_job(&record_id, kind, &job_id)?;

        tracing::debug!(record_id = %record_id, job_id = %job_id, "scheduled upload");
        Ok(job_id)
    }

    /// Cancel any pending job for a record and forget its mapping.
    pub async fn cancel(&self, record_id: &str) -> Result<(), UploadError> {
        let _serial = self.schedule_lock.lock().await;

        let existing = { self.store.lock().await.get_job(record_id)? };
        if let Some(job_id) = existing {
            self.scheduler.cancel(&job_id).await?;
            self.store.lock().await.remove_job(record_id)?;
            tracing::debug!(record_id = %record_id, job_id = %job_id, "canceled pending upload");
        }
        Ok(())
    }

    /// Look up the live job for a record, if any.
    pub async fn job_for(&self, record_id: &str) -> Result<Option<JobId>, UploadError> {
        Ok(self.store.lock().await.get_job(record_id)?)
    }

    /// One delivery attempt. Invoked by the scheduler, not a public entry
    /// point.
    async fn deliver(&self, spec: &JobSpec) -> JobOutcome {
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let payload = match self.buffer.read(spec.kind, &spec.record_id).await {
            Ok(payload) => payload,
            Err(e) => {
                // An unreadable record would retry forever; drop it and its
                // mapping instead of poisoning the pipeline.
                tracing::warn!(
                    record_id = %spec.record_id,
                    error = %e,
                    "buffered record unreadable, dropping"
                );
                if let Err(e) = self.buffer.remove(spec.kind, &spec.record_id).await {
                    tracing::warn!(
                        record_id = %spec.record_id,
                        error = %e,
                        "failed to remove unreadable record"
                    );
                }
                self.forget_job(&spec.record_id).await;
                return JobOutcome::Done;
            }
        };

        match self.exporter.send(spec.kind, &payload).await {
            Ok(()) => {
                if let Err(e) = self.buffer.remove(spec.kind, &spec.record_id).await {
                    // The mapping is still cleared; a surviving file is
                    // resent by the next start's recovery pass.
                    tracing::warn!(
                        record_id = %spec.record_id,
                        error = %e,
                        "delivered record could not be deleted"
                    );
                }
                self.forget_job(&spec.record_id).await;
                tracing::debug!(
                    record_id = %spec.record_id,
                    bytes = payload.len(),
                    "record delivered"
                );

                #[cfg(feature = "metrics")]
                GLOBAL_METRICS.record_operation("upload.deliver", start.elapsed());

                JobOutcome::Done
            }
            Err(e) => {
                tracing::debug!(
                    record_id = %spec.record_id,
                    error = %e,
                    "delivery failed, will retry"
                );
                JobOutcome::Retry
            }
        }
    }

    async fn forget_job(&self, record_id: &str) {
        if let Err(e) = self.store.lock().await.remove_job(record_id) {
            tracing::warn!(record_id = %record_id, error = %e, "failed to clear job mapping");
        }
    }
}

#[async_trait]
impl JobRunner for UploadCoordinator {
    async fn run(&self, spec: &JobSpec) -> JobOutcome {
        self.deliver(spec).await
    }
}
