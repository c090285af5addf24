// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Top-level agent context.
//!
//! Owns and wires every pipeline component. Collaborators are constructed
//! here and passed by reference; nothing in the pipeline is a global.

use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::quota::{QuotaTracker, StoragePolicy};
use crate::record::RecordBuffer;
use crate::session::{SessionController, UserIdentity};
use crate::store::AgentStore;
use crate::types::{RecordId, RecordKind};
use crate::upload::{
    Exporter, JobRunner, JobScheduler, OfflineRecoveryScanner, SchedulerConfig,
    TokioJobScheduler, UploadCoordinator,
};

/// Subdirectory of the data directory holding buffered records.
const BUFFER_DIR: &str = "buffer";

/// The embedded telemetry agent.
///
/// One instance per process. Construction recovers any records buffered by
/// a previous run before new work is accepted.
pub struct TelemetryAgent {
    config: AgentConfig,
    session: Arc<SessionController>,
    identity: Arc<UserIdentity>,
    buffer: Arc<RecordBuffer>,
    quota: Arc<QuotaTracker>,
    coordinator: Arc<UploadCoordinator>,
    recovery: Arc<OfflineRecoveryScanner>,
    scheduler: Arc<TokioJobScheduler>,
    pulse_task: Mutex<Option<JoinHandle<()>>>,
}

impl TelemetryAgent {
    /// Build the pipeline, recover offline records, and start the pulse
    /// timer.
    pub async fn start(config: AgentConfig, exporter: Arc<dyn Exporter>) -> Result<Self> {
        config.validate()?;

        let data_dir = config
            .resolve_data_dir()
            .ok_or_else(|| anyhow::anyhow!("no data directory available"))?;
        let buffer_root = data_dir.join(BUFFER_DIR);
        tokio::fs::create_dir_all(&buffer_root).await?;

        let store = Arc::new(AsyncMutex::new(AgentStore::open(&data_dir)?));

        let quota = Arc::new(QuotaTracker::new(StoragePolicy {
            root: buffer_root.clone(),
            max_bytes: config.storage.max_bytes,
            max_percent_of_free: config.storage.max_percent_of_free,
            min_free_bytes: config.storage.min_free_bytes,
            cache_ttl: config.storage.size_cache_ttl(),
        }));
        let buffer = Arc::new(RecordBuffer::new(buffer_root, Arc::clone(&quota)));

        let scheduler = TokioJobScheduler::new(SchedulerConfig {
            initial_delay: config.upload.initial_delay(),
            retry_delay: config.upload.retry_delay(),
            max_attempts: config.upload.max_attempts,
        });
        let coordinator = UploadCoordinator::new(
            Arc::clone(&buffer),
            Arc::clone(&store),
            Arc::clone(&scheduler) as Arc<dyn JobScheduler>,
            exporter,
        );
        scheduler.bind_runner(&(Arc::clone(&coordinator) as Arc<dyn JobRunner>));

        let recovery = Arc::new(OfflineRecoveryScanner::new(
            Arc::clone(&buffer),
            Arc::clone(&coordinator),
        ));
        let recovered = recovery.recover_all().await?;
        if recovered > 0 {
            tracing::info!(recovered, "recovered buffered records from a previous run");
        }

        let identity = Arc::new(UserIdentity::load(Arc::clone(&store)).await?);

        let session = Arc::new(SessionController::new(
            config.session.inactivity_timeout(),
            config.session.sampling_rate,
        ));
        let pulse_task = session.spawn_pulse(config.session.pulse_interval());

        tracing::info!(data_dir = %data_dir.display(), "telemetry agent started");

        Ok(Self {
            config,
            session,
            identity,
            buffer,
            quota,
            coordinator,
            recovery,
            scheduler,
            pulse_task: Mutex::new(Some(pulse_task)),
        })
    }

    /// Durably buffer a record and schedule its delivery.
    ///
    /// The file exists on disk before the job is scheduled; a crash between
    /// the two is healed by the next start's recovery pass. Producers are
    /// expected to stamp the current session id into the payload before
    /// calling this.
    pub async fn record(&self, kind: RecordKind, payload: &[u8]) -> Result<RecordId> {
        let record_id = self.buffer.store(kind, payload).await?;
        self.coordinator
            .schedule(kind, record_id.clone())
            .await?;
        Ok(record_id)
    }

    /// The session controller.
    pub fn session(&self) -> &SessionController {
        self.session.as_ref()
    }

    /// The anonymous user identity.
    pub fn identity(&self) -> &UserIdentity {
        self.identity.as_ref()
    }

    /// The record buffer.
    pub fn buffer(&self) -> &RecordBuffer {
        self.buffer.as_ref()
    }

    /// The quota tracker for the buffer region.
    pub fn quota(&self) -> &QuotaTracker {
        self.quota.as_ref()
    }

    /// The upload coordinator.
    pub fn coordinator(&self) -> &UploadCoordinator {
        self.coordinator.as_ref()
    }

    /// The offline recovery scanner.
    pub fn recovery(&self) -> &OfflineRecoveryScanner {
        self.recovery.as_ref()
    }

    /// The agent configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Number of upload jobs currently scheduled or running.
    pub fn live_upload_jobs(&self) -> usize {
        self.scheduler.live_jobs()
    }

    /// Stop the pulse timer. In-flight upload jobs keep running.
    pub fn shutdown(&self) {
        if let Some(task) = self.pulse_task.lock().unwrap().take() {
            task.abort();
            tracing::debug!("pulse task stopped");
        }
    }
}

impl Drop for TelemetryAgent {
    fn drop(&mut self) {
        self.shutdown();
    }
}
