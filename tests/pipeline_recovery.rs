// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end pipeline tests: buffering, delivery, and offline recovery.
//!
//! Each "process run" is a freshly wired pipeline over the same directories
//! and database, the way a restarted process would see them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Mutex;

use beacon::error::ExportError;
use beacon::quota::{QuotaTracker, StoragePolicy};
use beacon::record::RecordBuffer;
use beacon::store::{AgentStore, DB_FILE};
use beacon::types::RecordKind;
use beacon::upload::{
    Exporter, JobRunner, JobScheduler, OfflineRecoveryScanner, SchedulerConfig,
    TokioJobScheduler, UploadCoordinator,
};

// ============================================================================
// Test doubles
// ============================================================================

/// Exporter that rejects payloads on a deny-list and records the rest.
struct SelectiveExporter {
    reject: Vec<Vec<u8>>,
    sent: std::sync::Mutex<Vec<Vec<u8>>>,
}

impl SelectiveExporter {
    fn new(reject: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            reject,
            sent: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exporter for SelectiveExporter {
    async fn send(&self, _kind: RecordKind, payload: &[u8]) -> Result<(), ExportError> {
        if self.reject.iter().any(|r| r == payload) {
            return Err(ExportError::NetworkError("collector unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

// ============================================================================
// Pipeline fixture
// ============================================================================

struct Pipeline {
    buffer: Arc<RecordBuffer>,
    coordinator: Arc<UploadCoordinator>,
    scanner: OfflineRecoveryScanner,
}

/// Wire a pipeline over existing directories, as one process run would.
fn start_run(data_dir: &Path, exporter: Arc<dyn Exporter>) -> Pipeline {
    let root = data_dir.join("buffer");
    std::fs::create_dir_all(&root).unwrap();

    let quota = Arc::new(QuotaTracker::new(StoragePolicy {
        root: root.clone(),
        max_bytes: u64::MAX,
        max_percent_of_free: 100,
        min_free_bytes: 0,
        cache_ttl: Duration::from_secs(30),
    }));
    let buffer = Arc::new(RecordBuffer::new(root, quota));
    let store = Arc::new(Mutex::new(
        AgentStore::open_at(&data_dir.join(DB_FILE)).unwrap(),
    ));
    let scheduler = TokioJobScheduler::new(SchedulerConfig {
        initial_delay: Duration::from_millis(10),
        retry_delay: Duration::from_millis(10),
        max_attempts: 2,
    });
    let coordinator = UploadCoordinator::new(
        Arc::clone(&buffer),
        store,
        Arc::clone(&scheduler) as Arc<dyn JobScheduler>,
        exporter,
    );
    scheduler.bind_runner(&(Arc::clone(&coordinator) as Arc<dyn JobRunner>));

    let scanner = OfflineRecoveryScanner::new(Arc::clone(&buffer), Arc::clone(&coordinator));

    Pipeline {
        buffer,
        coordinator,
        scanner,
    }
}

/// Poll until a kind directory drains or two seconds elapse.
async fn wait_for_empty(buffer: &RecordBuffer, kind: RecordKind) -> bool {
    for _ in 0..100 {
        if buffer.list(kind).await.unwrap().is_empty() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_partial_delivery_then_recovery() {
    let temp = TempDir::new().unwrap();

    // First run: three records, the third one cannot be delivered.
    let exporter = SelectiveExporter::new(vec![b"three".to_vec()]);
    let run1 = start_run(temp.path(), Arc::clone(&exporter) as Arc<dyn Exporter>);

    let id1 = run1.buffer.store(RecordKind::Spans, b"one").await.unwrap();
    let id2 = run1.buffer.store(RecordKind::Spans, b"two").await.unwrap();
    let id3 = run1.buffer.store(RecordKind::Logs, b"three").await.unwrap();

    run1.coordinator
        .schedule(RecordKind::Spans, id1.clone())
        .await
        .unwrap();
    run1.coordinator
        .schedule(RecordKind::Spans, id2.clone())
        .await
        .unwrap();
    run1.coordinator
        .schedule(RecordKind::Logs, id3.clone())
        .await
        .unwrap();

    // The two deliverable records drain: files deleted, mappings cleared.
    assert!(wait_for_empty(&run1.buffer, RecordKind::Spans).await);
    assert_eq!(run1.coordinator.job_for(&id1).await.unwrap(), None);
    assert_eq!(run1.coordinator.job_for(&id2).await.unwrap(), None);

    // The failed record keeps its file and its mapping.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        run1.buffer.list(RecordKind::Logs).await.unwrap(),
        vec![id3.clone()]
    );
    let stale_job = run1.coordinator.job_for(&id3).await.unwrap().unwrap();

    // "Restart": a fresh pipeline over the same state, collector healthy.
    let exporter2 = SelectiveExporter::new(Vec::new());
    let run2 = start_run(temp.path(), Arc::clone(&exporter2) as Arc<dyn Exporter>);

    let resubmitted = run2.scanner.recover_all().await.unwrap();
    assert_eq!(resubmitted, 1);

    // The stale mapping was replaced before the new job was installed.
    let fresh_job = run2.coordinator.job_for(&id3).await.unwrap().unwrap();
    assert_ne!(fresh_job, stale_job);

    // The survivor drains byte-for-byte.
    assert!(wait_for_empty(&run2.buffer, RecordKind::Logs).await);
    assert_eq!(exporter2.sent(), vec![b"three".to_vec()]);
    assert_eq!(run2.coordinator.job_for(&id3).await.unwrap(), None);
}

#[tokio::test]
async fn test_crash_before_schedule_roundtrip() {
    let temp = TempDir::new().unwrap();

    // First run buffers a record and "crashes" before scheduling it.
    let payload = b"span batch from a dead process".to_vec();
    {
        let exporter = SelectiveExporter::new(Vec::new());
        let run = start_run(temp.path(), exporter as Arc<dyn Exporter>);
        run.buffer.store(RecordKind::Spans, &payload).await.unwrap();
    }

    // The restarted process rediscovers and delivers it unchanged.
    let exporter = SelectiveExporter::new(Vec::new());
    let run = start_run(temp.path(), Arc::clone(&exporter) as Arc<dyn Exporter>);

    let ids = run.buffer.list(RecordKind::Spans).await.unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        run.buffer.read(RecordKind::Spans, &ids[0]).await.unwrap(),
        payload
    );

    assert_eq!(run.scanner.recover_all().await.unwrap(), 1);
    assert!(wait_for_empty(&run.buffer, RecordKind::Spans).await);
    assert_eq!(exporter.sent(), vec![payload]);
}

#[tokio::test]
async fn test_recovery_is_single_shot_across_calls() {
    let temp = TempDir::new().unwrap();

    let exporter = SelectiveExporter::new(vec![b"held".to_vec()]);
    let run = start_run(temp.path(), exporter as Arc<dyn Exporter>);

    run.buffer.store(RecordKind::Spans, b"held").await.unwrap();

    assert_eq!(run.scanner.recover_all().await.unwrap(), 1);
    // A second sweep in the same process must not double-schedule.
    assert_eq!(run.scanner.recover_all().await.unwrap(), 0);
}
