// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry-about-telemetry: logging and internal metrics.
//!
//! The agent reports its own behavior through `tracing` and a small local
//! metrics collector. Failures in the pipeline are logged, never raised
//! into the host application (see the error-handling policy in `error`).
//!
//! Initialize tracing once at host startup:
//!
//! ```rust,ignore
//! use beacon::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::production())?;
//! ```
//!
//! Metrics recording is gated behind the `metrics` cargo feature (on by
//! default); disable it for minimal overhead.

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{Metrics, MetricsSnapshot, OperationMetrics, GLOBAL_METRICS};
