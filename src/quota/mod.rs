// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Storage quota tracking and eviction.
//!
//! Tracks occupied space for the buffer region and decides when buffered
//! data must be evicted. Computing a real directory size means a recursive
//! walk, so readings are cached with bounded staleness and refreshed off
//! the calling thread; producer threads never wait on a full walk unless
//! the cache is cold.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use walkdir::WalkDir;

use crate::error::BufferError;

#[cfg(feature = "metrics")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Occupied-space bounds for a buffer region. Read-only at runtime.
#[derive(Debug, Clone)]
pub struct StoragePolicy {
    /// Region root directory.
    pub root: PathBuf,

    /// Maximum bytes the region may occupy.
    pub max_bytes: u64,

    /// Maximum occupied space as a percentage of free disk space.
    pub max_percent_of_free: u8,

    /// Minimum free disk space to preserve on the underlying volume.
    pub min_free_bytes: u64,

    /// How long a cached size reading stays fresh.
    pub cache_ttl: Duration,
}

impl StoragePolicy {
    /// True if any bound is violated for the given readings.
    pub fn over_bound(&self, occupied: u64, available: u64) -> bool {
        if occupied > self.max_bytes {
            return true;
        }
        if available < self.min_free_bytes {
            return true;
        }
        (occupied as u128) * 100 > (available as u128) * self.max_percent_of_free as u128
    }
}

#[derive(Debug, Clone)]
struct SizeEntry {
    value: u64,
    computed_at: Instant,
    in_flight: bool,
}

/// Tracks occupied space for one region with a bounded-staleness cache.
pub struct QuotaTracker {
    policy: StoragePolicy,
    cache: Arc<Mutex<Option<SizeEntry>>>,
}

impl QuotaTracker {
    /// Create a tracker for a region.
    pub fn new(policy: StoragePolicy) -> Self {
        Self {
            policy,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// The region's policy.
    pub fn policy(&self) -> &StoragePolicy {
        &self.policy
    }

    /// Occupied bytes for the region.
    ///
    /// A reading within the staleness window is returned immediately while
    /// a recomputation (at most one at a time) refreshes the cache in the
    /// background. A cold or expired cache is recomputed before returning.
    pub async fn occupied_size(&self) -> u64 {
        let mut cache = self.cache.lock().await;

        if let Some(entry) = cache.as_mut() {
            if entry.computed_at.elapsed() < self.policy.cache_ttl {
                if !entry.in_flight {
                    entry.in_flight = true;
                    self.spawn_recompute();
                }
                return entry.value;
            }
        }

        let value = compute_occupied(self.policy.root.clone()).await;
        *cache = Some(SizeEntry {
            value,
            computed_at: Instant::now(),
            in_flight: false,
        });
        value
    }

    /// True if the region currently violates any storage bound.
    pub async fn should_evict(&self) -> Result<bool, BufferError> {
        let occupied = self.occupied_size().await;
        let available = available_space(&self.policy.root)?;
        Ok(self.policy.over_bound(occupied, available))
    }

    /// Delete oldest files until the region is within bounds.
    ///
    /// Works from fresh readings, not the cache, and refreshes the cache
    /// with the post-eviction size. Returns the bytes freed.
    pub async fn evict_to_fit(&self) -> Result<u64, BufferError> {
        let policy = self.policy.clone();

        let (freed, occupied) =
            tokio::task::spawn_blocking(move || -> Result<(u64, u64), BufferError> {
                let mut freed = 0u64;
                let mut occupied = directory_size(&policy.root);

                loop {
                    let available = available_space(&policy.root)?;
                    if !policy.over_bound(occupied, available) {
                        break;
                    }
                    let Some((path, len)) = oldest_file(&policy.root) else {
                        break;
                    };
                    match std::fs::remove_file(&path) {
                        Ok(()) => {
                            freed += len;
                            occupied = occupied.saturating_sub(len);
                            tracing::warn!(
                                path = %path.display(),
                                bytes = len,
                                "evicted oldest buffered file"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                path = %path.display(),
                                error = %e,
                                "eviction could not delete file"
                            );
                            break;
                        }
                    }
                }

                Ok((freed, occupied))
            })
            .await
            .map_err(|e| BufferError::IoError(e.to_string()))??;

        let mut cache = self.cache.lock().await;
        *cache = Some(SizeEntry {
            value: occupied,
            computed_at: Instant::now(),
            in_flight: false,
        });

        Ok(freed)
    }

    fn spawn_recompute(&self) {
        let cache = Arc::clone(&self.cache);
        let root = self.policy.root.clone();
        tokio::spawn(async move {
            let value = compute_occupied(root).await;
            let mut cache = cache.lock().await;
            *cache = Some(SizeEntry {
                value,
                computed_at: Instant::now(),
                in_flight: false,
            });
        });
    }
}

async fn compute_occupied(root: PathBuf) -> u64 {
    #[cfg(feature = "metrics")]
    let start = Instant::now();

    let value = tokio::task::spawn_blocking(move || directory_size(&root))
        .await
        .unwrap_or(0);

    #[cfg(feature = "metrics")]
    GLOBAL_METRICS.record_operation("quota.compute_size", start.elapsed());

    value
}

/// Total size of all files under a directory.
fn directory_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// The oldest file under a directory by modification time, with its size.
fn oldest_file(root: &Path) -> Option<(PathBuf, u64)> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            let mtime = meta.modified().ok()?;
            Some((entry.into_path(), meta.len(), mtime))
        })
        .min_by_key(|(_, _, mtime)| *mtime)
        .map(|(path, len, _)| (path, len))
}

/// Free space on the volume holding `path`.
pub(crate) fn available_space(path: &Path) -> Result<u64, BufferError> {
    let vfs = nix::sys::statvfs::statvfs(path)
        .map_err(|e| BufferError::IoError(format!("statvfs failed: {}", e)))?;
    Ok(vfs.blocks_available() as u64 * vfs.fragment_size() as u64)
}
