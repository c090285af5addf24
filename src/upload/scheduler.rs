// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Deferred job scheduling.
//!
//! The coordinator talks to the scheduler through the [`JobScheduler`]
//! trait so hosts can plug in a platform scheduler; [`TokioJobScheduler`]
//! is the default in-process implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::AbortHandle;

use crate::error::UploadError;
use crate::types::{JobId, JobSpec};

/// Outcome of one deferred delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job is finished: delivered, or permanently abandoned.
    Done,
    /// Transient failure; run again after the retry delay.
    Retry,
}

/// Callback the scheduler drives for each job attempt.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Execute one attempt of the job.
    async fn run(&self, spec: &JobSpec) -> JobOutcome;
}

/// Deferred-task scheduler contract.
///
/// `cancel` is idempotent: canceling a completed, unknown, or already
/// canceled job is a no-op, not an error. Job ids are opaque and only
/// valid within the scheduler instance that issued them.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Schedule a deferred run of `spec`, returning its job id.
    async fn run_deferred(&self, spec: JobSpec) -> Result<JobId, UploadError>;

    /// Cancel a scheduled job.
    async fn cancel(&self, job_id: &JobId) -> Result<(), UploadError>;
}

/// Timing knobs for the tokio scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay before the first delivery attempt.
    pub initial_delay: Duration,

    /// Delay between retry attempts.
    pub retry_delay: Duration,

    /// Attempts before giving up for this process lifetime.
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

/// Tokio-task scheduler with fixed-delay retry.
///
/// Each job is one spawned task: initial delay, then attempts separated by
/// the retry delay until the runner reports [`JobOutcome::Done`] or the
/// attempt cap is reached. A record whose job gives up stays buffered and
/// is resubmitted by the next process start's recovery pass.
pub struct TokioJobScheduler {
    config: SchedulerConfig,
    runner: RwLock<Option<Weak<dyn JobRunner>>>,
    jobs: Arc<Mutex<HashMap<JobId, AbortHandle>>>,
}

impl TokioJobScheduler {
    /// Create a scheduler. Bind a runner before scheduling jobs.
    pub fn new(config: SchedulerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            runner: RwLock::new(None),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Bind the runner jobs are dispatched to. Called once at wiring time;
    /// held weakly so the runner may own the scheduler.
    pub fn bind_runner(&self, runner: &Arc<dyn JobRunner>) {
        *self.runner.write().unwrap() = Some(Arc::downgrade(runner));
    }

    /// Number of jobs currently scheduled or running.
    pub fn live_jobs(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    fn runner(&self) -> Result<Arc<dyn JobRunner>, UploadError> {
        self.runner
            .read()
            .unwrap()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| UploadError::Scheduler("no job runner bound".to_string()))
    }
}

#[async_trait]
impl JobScheduler for TokioJobScheduler {
    async fn run_deferred(&self, spec: JobSpec) -> Result<JobId, UploadError> {
        let runner = self.runner()?;
        let job_id: JobId = uuid::Uuid::new_v4().to_string();
        let config = self.config.clone();
        let jobs = Arc::clone(&self.jobs);
        let task_job_id = job_id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(config.initial_delay).await;
            let mut attempt = 1u32;
            loop {
                match runner.run(&spec).await {
                    JobOutcome::Done => break,
                    JobOutcome::Retry if attempt < config.max_attempts => {
                        attempt += 1;
                        tokio::time::sleep(config.retry_delay).await;
                    }
                    JobOutcome::Retry => {
                        tracing::warn!(
                            record_id = %spec.record_id,
                            attempts = attempt,
                            "delivery gave up; record stays buffered for the next start"
                        );
                        break;
                    }
                }
            }
            jobs.lock().unwrap().remove(&task_job_id);
        });

        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.clone(), handle.abort_handle());
        Ok(job_id)
    }

    async fn cancel(&self, job_id: &JobId) -> Result<(), UploadError> {
        if let Some(handle) = self.jobs.lock().unwrap().remove(job_id) {
            handle.abort();
            tracing::debug!(job_id = %job_id, "canceled scheduled job");
        }
        Ok(())
    }
}
