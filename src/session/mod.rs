// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session and user identity management.
//!
//! A session is a rotating identity stamped onto every record at creation
//! time. The controller rotates it on explicit reset or when activity
//! resumes after the inactivity timeout, and publishes rotation and
//! keep-alive events over a broadcast channel:
//!
//! ```text
//! activity / reset ──▶ SessionController ──▶ SessionEvent::Changed
//!                            │
//!       pulse timer ─────────┴────────────▶ SessionEvent::Pulse
//! ```
//!
//! The anonymous [`UserIdentity`] rides alongside: a nullable user id that
//! exists exactly while anonymous tracking is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon::session::SessionController;
//! use std::time::Duration;
//!
//! let controller = SessionController::new(Duration::from_secs(120), 1.0);
//! let mut events = controller.subscribe();
//!
//! // A producer stamps the current session onto a record.
//! let session_id = controller.session_id();
//!
//! // A lifecycle signal source reports activity.
//! controller.touch();
//! ```

mod controller;
mod identity;
mod types;

pub use controller::SessionController;
pub use identity::{TrackingMode, UserIdentity};
pub use types::{Session, SessionEvent};
