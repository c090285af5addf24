// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Exporter seam to the external transport.

use async_trait::async_trait;

use crate::error::ExportError;
use crate::types::RecordKind;

/// Hand-off point to the wire transport that talks to the collector.
///
/// Implementations own encoding and HTTP; the pipeline only needs a
/// success-or-failure verdict per payload. Delivery is at-least-once: an
/// exporter may see the same payload again after a crash, so collector
/// ingestion is expected to be idempotent.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Deliver one buffered payload to the collector.
    async fn send(&self, kind: RecordKind, payload: &[u8]) -> Result<(), ExportError>;
}
