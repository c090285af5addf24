// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for identifier generation and record buffering.

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use beacon::idgen::{generate, HEX_ALPHABET, URL_SAFE_ALPHABET};
use beacon::quota::{QuotaTracker, StoragePolicy};
use beacon::record::RecordBuffer;
use beacon::types::RecordKind;

/// Benchmark identifier generation across alphabets and lengths.
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("idgen/generate");

    for length in [8, 16, 32, 64] {
        group.bench_with_input(BenchmarkId::new("hex", length), &length, |b, &length| {
            b.iter(|| generate(black_box(HEX_ALPHABET), length).unwrap());
        });

        group.bench_with_input(
            BenchmarkId::new("url_safe", length),
            &length,
            |b, &length| {
                b.iter(|| generate(black_box(URL_SAFE_ALPHABET), length).unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark the durable store path (temp write + fsync + rename).
fn bench_buffer_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("buffer");
    std::fs::create_dir_all(&root).unwrap();

    let quota = Arc::new(QuotaTracker::new(StoragePolicy {
        root: root.clone(),
        max_bytes: u64::MAX,
        max_percent_of_free: 100,
        min_free_bytes: 0,
        cache_ttl: Duration::from_secs(30),
    }));
    let buffer = Arc::new(RecordBuffer::new(root, quota));

    let mut group = c.benchmark_group("buffer/store");

    for size in [256usize, 4096, 65536] {
        let payload = vec![0u8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.to_async(&rt).iter(|| {
                let buffer = Arc::clone(&buffer);
                let payload = payload.clone();
                async move {
                    buffer
                        .store(RecordKind::Spans, black_box(&payload))
                        .await
                        .unwrap()
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_buffer_store);
criterion_main!(benches);
