// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Record buffering.
//!
//! A record is an immutable opaque payload (a span batch or a log batch)
//! produced by external instrumentation. This module persists each record
//! as one file named by its RecordId inside a kind-specific directory;
//! deletion happens only after confirmed delivery (see `upload`) or
//! permanent abandonment.

mod buffer;

pub use buffer::RecordBuffer;
