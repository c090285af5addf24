// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session lifecycle state machine.
//!
//! Owns the current session id and decides when it rotates: explicit
//! reset, or a qualifying activity signal after the inactivity timeout.
//! Listeners receive rotation and keep-alive notifications over a
//! broadcast channel rather than mutable callback sets, so signals may
//! arrive on arbitrary threads without ad hoc listener locking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::types::SessionId;

use super::types::{Session, SessionEvent};

/// Broadcast capacity for session events; lagging receivers lose oldest.
const EVENT_CAPACITY: usize = 64;

/// Owns the current session and its rotation rules.
pub struct SessionController {
    inactivity_timeout: Duration,
    sampling_rate: f64,
    state: Mutex<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Create a controller with the given inactivity timeout and sampling
    /// rate (0.0..=1.0).
    pub fn new(inactivity_timeout: Duration, sampling_rate: f64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inactivity_timeout,
            sampling_rate,
            state: Mutex::new(None),
            events,
        }
    }

    /// Subscribe to session-changed and pulse notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The current session, created on first access.
    ///
    /// Reading never rotates; only [`touch`](Self::touch) and
    /// [`reset`](Self::reset) do.
    pub fn current(&self) -> Session {
        self.current_at(Utc::now())
    }

    /// Current session id. Producers attach this to every record at
    /// record-creation time.
    pub fn session_id(&self) -> SessionId {
        self.current().id
    }

    /// Sampling decision for the current session.
    pub fn is_sampled(&self) -> bool {
        self.current().sampled
    }

    /// Id of the session the current one replaced, if any.
    pub fn previous_session_id(&self) -> Option<SessionId> {
        self.current().previous_id
    }

    /// Record a qualifying activity signal.
    ///
    /// Rotates the session when the inactivity timeout has elapsed since
    /// the last activity; otherwise only bumps the activity timestamp, with
    /// no notification.
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    /// Rotate the session unconditionally.
    pub fn reset(&self) {
        self.reset_at(Utc::now());
    }

    /// Publish a keep-alive pulse for the current session, if one exists.
    ///
    /// Never bumps the activity timestamp and never rotates.
    pub fn pulse(&self) {
        let id = {
            let state = self.state.lock().unwrap();
            match state.as_ref() {
                Some(session) => session.id.clone(),
                None => return,
            }
        };
        let _ = self.events.send(SessionEvent::Pulse { id });
    }

    /// Spawn the periodic pulse task.
    pub fn spawn_pulse(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                controller.pulse();
            }
        })
    }

    pub(crate) fn current_at(&self, now: DateTime<Utc>) -> Session {
        let created = {
            let mut state = self.state.lock().unwrap();
            if let Some(session) = state.as_ref() {
                return session.clone();
            }
            let session = self.new_session(None, now);
            *state = Some(session.clone());
            session
        };
        self.notify_changed(&created);
        created
    }

    pub(crate) fn touch_at(&self, now: DateTime<Utc>) {
        let rotated = {
            let mut state = self.state.lock().unwrap();
            match state.as_mut() {
                None => {
                    let session = self.new_session(None, now);
                    *state = Some(session.clone());
                    Some(session)
                }
                Some(session) if self.timed_out(session.last_activity, now) => {
                    let next = self.new_session(Some(session.id.clone()), now);
                    *state = Some(next.clone());
                    Some(next)
                }
                Some(session) => {
                    session.last_activity = now;
                    None
                }
            }
        };
        if let Some(session) = rotated {
            self.notify_changed(&session);
        }
    }

    pub(crate) fn reset_at(&self, now: DateTime<Utc>) {
        let session = {
            let mut state = self.state.lock().unwrap();
            let previous_id = state.as_ref().map(|session| session.id.clone());
            let session = self.new_session(previous_id, now);
            *state = Some(session.clone());
            session
        };
        self.notify_changed(&session);
    }

    fn timed_out(&self, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(last_activity).to_std() {
            Ok(elapsed) => elapsed > self.inactivity_timeout,
            // Clock went backwards; treat the session as active.
            Err(_) => false,
        }
    }

    fn new_session(&self, previous_id: Option<SessionId>, now: DateTime<Utc>) -> Session {
        let sampled = sample(self.sampling_rate);
        let session = Session::start(previous_id, sampled, now);
        tracing::debug!(session_id = %session.id, sampled, "session started");
        session
    }

    fn notify_changed(&self, session: &Session) {
        let _ = self.events.send(SessionEvent::Changed {
            id: session.id.clone(),
            previous_id: session.previous_id.clone(),
            sampled: session.sampled,
        });
    }
}

/// Decide sampling once for a new session.
fn sample(rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    if rate <= 0.0 {
        return false;
    }
    rand::thread_rng().gen::<f64>() < rate
}
