// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::SessionId;

/// A bounded span of user activity.
///
/// Exactly one session is current per process at any time. The id is
/// immutable once created; rotation replaces the whole session and links
/// back through `previous_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (32 hex chars, never all-zero).
    pub id: SessionId,

    /// Identifier of the session this one replaced, if any.
    pub previous_id: Option<SessionId>,

    /// Sampling decision, made once at creation and never re-evaluated.
    pub sampled: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the most recent qualifying activity signal.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Create a session starting at `now`.
    pub(crate) fn start(
        previous_id: Option<SessionId>,
        sampled: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: crate::idgen::session_id(),
            previous_id,
            sampled,
            created_at: now,
            last_activity: now,
        }
    }
}

/// Notifications published by the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new session became current.
    Changed {
        /// The new session id.
        id: SessionId,
        /// The session it replaced, for boundary stitching downstream.
        previous_id: Option<SessionId>,
        /// The new session's sampling decision.
        sampled: bool,
    },
    /// Periodic keep-alive for the current session.
    Pulse {
        /// The current session id.
        id: SessionId,
    },
}
