// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anonymous user identity.

use std::sync::{Arc, Mutex as StdMutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::idgen;
use crate::store::AgentStore;

/// Store key for the persisted anonymous user id.
const KEY_USER_ID: &str = "user_id";

/// Store key for the persisted tracking mode.
const KEY_TRACKING_MODE: &str = "tracking_mode";

/// Whether the agent attributes records to an anonymous user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// No user identifier is attached to records.
    NoTracking,
    /// Records carry a generated anonymous identifier.
    AnonymousTracking,
}

impl TrackingMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::NoTracking => "no_tracking",
            Self::AnonymousTracking => "anonymous_tracking",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "no_tracking" => Some(Self::NoTracking),
            "anonymous_tracking" => Some(Self::AnonymousTracking),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct IdentityState {
    mode: TrackingMode,
    user_id: Option<String>,
}

/// Anonymous user id lifecycle, coupled to the tracking-mode switch.
///
/// Invariant: the user id is `Some` iff the mode is
/// [`TrackingMode::AnonymousTracking`].
pub struct UserIdentity {
    store: Arc<Mutex<AgentStore>>,
    state: StdMutex<IdentityState>,
    /// Serializes mode switches; reads stay lock-cheap.
    switch_lock: Mutex<()>,
}

impl UserIdentity {
    /// Load persisted identity state, defaulting to no tracking.
    pub async fn load(store: Arc<Mutex<AgentStore>>) -> Result<Self, StoreError> {
        let state = {
            let guard = store.lock().await;
            let mode = guard
                .get_value(KEY_TRACKING_MODE)?
                .and_then(|value| TrackingMode::parse(&value))
                .unwrap_or(TrackingMode::NoTracking);
            let user_id = match mode {
                TrackingMode::AnonymousTracking => guard.get_value(KEY_USER_ID)?,
                TrackingMode::NoTracking => None,
            };
            IdentityState { mode, user_id }
        };

        Ok(Self {
            store,
            state: StdMutex::new(state),
            switch_lock: Mutex::new(()),
        })
    }

    /// Current tracking mode.
    pub fn tracking_mode(&self) -> TrackingMode {
        self.state.lock().unwrap().mode
    }

    /// Current anonymous user id; `Some` iff tracking is anonymous.
    pub fn user_id(&self) -> Option<String> {
        self.state.lock().unwrap().user_id.clone()
    }

    /// Switch tracking mode, returning the user id now in effect.
    ///
    /// Entering anonymous tracking from no-tracking always generates a
    /// fresh id; staying in anonymous tracking preserves the existing one;
    /// leaving clears it unconditionally.
    pub async fn set_tracking_mode(
        &self,
        mode: TrackingMode,
    ) -> Result<Option<String>, StoreError> {
        let _serial = self.switch_lock.lock().await;

        let next = {
            let state = self.state.lock().unwrap();
            next_user_id(mode, state.mode, state.user_id.as_deref())
        };

        {
            let store = self.store.lock().await;
            store.put_value(KEY_TRACKING_MODE, mode.as_str())?;
            match &next {
                Some(id) => store.put_value(KEY_USER_ID, id)?,
                None => {
                    store.remove_value(KEY_USER_ID)?;
                }
            }
        }

        let mut state = self.state.lock().unwrap();
        state.mode = mode;
        state.user_id = next.clone();

        tracing::debug!(mode = mode.as_str(), has_user_id = next.is_some(), "tracking mode set");
        Ok(next)
    }
}

/// Pure transition for the anonymous id across a mode switch.
pub(crate) fn next_user_id(
    new_mode: TrackingMode,
    old_mode: TrackingMode,
    old_id: Option<&str>,
) -> Option<String> {
    match new_mode {
        TrackingMode::NoTracking => None,
        TrackingMode::AnonymousTracking => match (old_mode, old_id) {
            (TrackingMode::AnonymousTracking, Some(id)) => Some(id.to_string()),
            _ => Some(idgen::user_id()),
        },
    }
}
