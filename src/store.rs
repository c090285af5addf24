// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SQLite-backed agent store.
//!
//! Holds the two small key-value maps the pipeline persists: the
//! RecordId → JobId map for pending upload jobs, and the anonymous user
//! identity state. Buffered record payloads live as plain files (see
//! `record::buffer`), never in here.

use std::path::{Path, PathBuf};
#[cfg(feature = "metrics")]
use std::time::Instant;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::types::{JobId, RecordId, RecordKind};

#[cfg(feature = "metrics")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database file name inside the agent data directory.
pub const DB_FILE: &str = "beacon.db";

/// Agent store using SQLite.
pub struct AgentStore {
    conn: Connection,
    path: PathBuf,
}

impl AgentStore {
    /// Open or create the agent database inside a data directory.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::OpenFailed(format!("Failed to create data directory: {}", e))
        })?;

        Self::open_at(&data_dir.join(DB_FILE))
    }

    /// Open or create the agent database at a specific path.
    ///
    /// This is useful for testing or when you want to use a custom location.
    pub fn open_at(db_path: &Path) -> Result<Self, StoreError> {
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::OpenFailed(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| StoreError::OpenFailed(format!("Failed to open database: {}", e)))?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StoreError::OpenFailed(format!("Failed to set pragmas: {}", e)))?;

        let mut store = Self {
            conn,
            path: db_path.to_path_buf(),
        };

        store.init_schema()?;

        #[cfg(feature = "metrics")]
        GLOBAL_METRICS.record_operation("store.open", start.elapsed());

        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS upload_jobs (
                record_id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                job_id TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS identity (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_upload_jobs_created_at ON upload_jobs(created_at);
            "#,
            )
            .map_err(|e| StoreError::OpenFailed(format!("Failed to create schema: {}", e)))?;

        let current_version: Option<u32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to get schema version: {}", e)))?;

        if current_version.is_none() {
            self.conn
                .execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![SCHEMA_VERSION],
                )
                .map_err(|e| {
                    StoreError::QueryFailed(format!("Failed to set schema version: {}", e))
                })?;
        }

        Ok(())
    }

    /// Install (or replace) the job mapping for a record.
    pub fn put_job(
        &self,
        record_id: &str,
        kind: RecordKind,
        job_id: &str,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                r#"
            INSERT OR REPLACE INTO upload_jobs (record_id, kind, job_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
                params![
                    record_id,
                    kind.dir_name(),
                    job_id,
                    chrono::Utc::now().timestamp()
                ],
            )
            .map_err(|e| StoreError::QueryFailed(format!("Failed to put job: {}", e)))?;

        Ok(())
    }

    /// Get the job mapped to a record, if any.
    pub fn get_job(&self, record_id: &str) -> Result<Option<JobId>, StoreError> {
        self.conn
            .query_row(
                "SELECT job_id FROM upload_jobs WHERE record_id = ?",
                params![record_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to get job: {}", e)))
    }

    /// Remove the job mapping for a record. Returns whether one existed.
    pub fn remove_job(&self, record_id: &str) -> Result<bool, StoreError> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM upload_jobs WHERE record_id = ?",
                params![record_id],
            )
            .map_err(|e| StoreError::QueryFailed(format!("Failed to remove job: {}", e)))?;

        Ok(rows > 0)
    }

    /// List all job mappings, oldest first.
    pub fn list_jobs(&self) -> Result<Vec<(RecordId, JobId)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_id, job_id FROM upload_jobs ORDER BY created_at ASC")
            .map_err(|e| StoreError::QueryFailed(format!("Failed to prepare query: {}", e)))?;

        let jobs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| StoreError::QueryFailed(format!("Failed to query jobs: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to collect jobs: {}", e)))?;

        Ok(jobs)
    }

    /// Count of live job mappings.
    pub fn job_count(&self) -> Result<u32, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM upload_jobs", [], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count jobs: {}", e)))?;

        Ok(count as u32)
    }

    /// Get an identity value by key.
    pub fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row(
                "SELECT value FROM identity WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::QueryFailed(format!("Failed to get value: {}", e)))
    }

    /// Set an identity value.
    pub fn put_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO identity (key, value, updated_at) VALUES (?, ?, ?)",
                params![key, value, chrono::Utc::now().timestamp()],
            )
            .map_err(|e| StoreError::QueryFailed(format!("Failed to put value: {}", e)))?;

        Ok(())
    }

    /// Remove an identity value. Returns whether one existed.
    pub fn remove_value(&self, key: &str) -> Result<bool, StoreError> {
        let rows = self
            .conn
            .execute("DELETE FROM identity WHERE key = ?", params![key])
            .map_err(|e| StoreError::QueryFailed(format!("Failed to remove value: {}", e)))?;

        Ok(rows > 0)
    }

    /// Get the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (AgentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = AgentStore::open_at(&temp_dir.path().join(DB_FILE)).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_put_and_get_job() {
        let (store, _temp) = create_test_store();

        store
            .put_job("record-1", RecordKind::Spans, "job-1")
            .unwrap();

        assert_eq!(store.get_job("record-1").unwrap(), Some("job-1".to_string()));
        assert_eq!(store.get_job("record-2").unwrap(), None);
    }

    #[test]
    fn test_put_job_replaces() {
        let (store, _temp) = create_test_store();

        store
            .put_job("record-1", RecordKind::Spans, "job-1")
            .unwrap();
        store
            .put_job("record-1", RecordKind::Spans, "job-2")
            .unwrap();

        assert_eq!(store.get_job("record-1").unwrap(), Some("job-2".to_string()));
        assert_eq!(store.job_count().unwrap(), 1);
    }

    #[test]
    fn test_remove_job() {
        let (store, _temp) = create_test_store();

        store.put_job("record-1", RecordKind::Logs, "job-1").unwrap();

        assert!(store.remove_job("record-1").unwrap());
        assert!(!store.remove_job("record-1").unwrap());
        assert_eq!(store.get_job("record-1").unwrap(), None);
    }

    #[test]
    fn test_list_jobs() {
        let (store, _temp) = create_test_store();

        for i in 0..3 {
            store
                .put_job(&format!("record-{}", i), RecordKind::Spans, &format!("job-{}", i))
                .unwrap();
        }

        let jobs = store.list_jobs().unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(store.job_count().unwrap(), 3);
    }

    #[test]
    fn test_identity_values() {
        let (store, _temp) = create_test_store();

        assert_eq!(store.get_value("user_id").unwrap(), None);

        store.put_value("user_id", "abc").unwrap();
        assert_eq!(store.get_value("user_id").unwrap(), Some("abc".to_string()));

        store.put_value("user_id", "def").unwrap();
        assert_eq!(store.get_value("user_id").unwrap(), Some("def".to_string()));

        assert!(store.remove_value("user_id").unwrap());
        assert!(!store.remove_value("user_id").unwrap());
        assert_eq!(store.get_value("user_id").unwrap(), None);
    }

    #[test]
    fn test_reopen_preserves_state() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(DB_FILE);

        {
            let store = AgentStore::open_at(&db_path).unwrap();
            store.put_job("record-1", RecordKind::Spans, "job-1").unwrap();
            store.put_value("tracking_mode", "no_tracking").unwrap();
        }

        let store = AgentStore::open_at(&db_path).unwrap();
        assert_eq!(store.get_job("record-1").unwrap(), Some("job-1".to_string()));
        assert_eq!(
            store.get_value("tracking_mode").unwrap(),
            Some("no_tracking".to_string())
        );
    }
}
