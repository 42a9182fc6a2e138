// SPDX-License-Identifier: BUSL-1.1

//! Per-node session state machine with idle and suspend
//! timers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clock::{EpochMs, SharedClock};
use crate::error::{GatewayError, Result};
use crate::subscription::{Disposer, HandlerSet};

type StateChangeHandler = dyn Fn(&StateChange) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connected,
    Suspended,
    Reconnecting,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connect,
    Disconnect,
    Suspend,
    Resume,
    Activity,
    Timeout,
}

/// Table-driven transition. Returns `None` for unlisted
/// (state, event) pairs, which leave the session untouched.
fn transition(state: SessionState, event: SessionEvent) -> Option<SessionState> {
    use SessionEvent::*;
    use SessionState::*;
    match (state, event) {
        (Connected, Disconnect) => Some(Disconnected),
        (Connected, Suspend) => Some(Suspended),
        (Connected, Activity) => Some(Connected),
        (Connected, Timeout) => Some(Suspended),

        (Suspended, Disconnect) => Some(Disconnected),
        (Suspended, Resume) => Some(Reconnecting),
        (Suspended, Activity) => Some(Connected),
        (Suspended, Timeout) => Some(Disconnected),

        (Reconnecting, Connect) => Some(Connected),
        (Reconnecting, Disconnect) => Some(Disconnected),
        (Reconnecting, Activity) => Some(Connected),
        (Reconnecting, Timeout) => Some(Disconnected),

        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub node_id: String,
    pub state: SessionState,
    pub connected_at: EpochMs,
    pub last_activity_at: EpochMs,
    pub reconnect_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct StateChange {
    pub node_id: String,
    pub from: SessionState,
    pub to: SessionState,
}

struct Timers {
    session_timeout: Option<CancellationToken>,
    suspend_timeout: Option<CancellationToken>,
}

impl Timers {
    fn cancel(&mut self) {
        if let Some(t) = self.session_timeout.take() {
            t.cancel();
        }
        if let Some(t) = self.suspend_timeout.take() {
            t.cancel();
        }
    }
}

pub struct SessionManagerConfig {
    pub session_timeout: Duration,
    pub suspend_timeout: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self { session_timeout: Duration::from_secs(60), suspend_timeout: Duration::from_secs(300) }
    }
}

/// Tracks one `Session` per node, enforcing the state machine and managing
/// per-node idle/suspend timers.
pub struct SessionManager {
    clock: SharedClock,
    config: SessionManagerConfig,
    sessions: HashMap<String, Session>,
    timers: HashMap<String, Timers>,
    state_change_handlers: Arc<HandlerSet<StateChangeHandler>>,
}

impl SessionManager {
    pub fn new(clock: SharedClock, config: SessionManagerConfig) -> Self {
        Self {
            clock,
            config,
            sessions: HashMap::new(),
            timers: HashMap::new(),
            state_change_handlers: Arc::new(HandlerSet::new()),
        }
    }

    /// Create a session for `node_id`. Fails with `AlreadyExists` if a
    /// non-disconnected session for that node already exists.
    pub fn create_session(
        &mut self,
        node_id: &str,
        identity_context: Option<serde_json::Value>,
    ) -> Result<Session> {
        if let Some(existing) = self.sessions.get(node_id) {
            if existing.state != SessionState::Disconnected {
                return Err(GatewayError::AlreadyExists);
            }
        }
        let now = self.clock.now_ms();
        let session = Session {
            session_id: Uuid::new_v4(),
            node_id: node_id.to_string(),
            state: SessionState::Connected,
            connected_at: now,
            last_activity_at: now,
            reconnect_count: 0,
            identity_context,
        };
        self.sessions.insert(node_id.to_string(), session.clone());
        self.timers.remove(node_id);
        Ok(session)
    }

    /// Apply `event` to `node_id`'s session. Returns the new state, or
    /// `None` if there was no session or the transition is unlisted.
    pub fn handle_event(&mut self, node_id: &str, event: SessionEvent) -> Option<SessionState> {
        let current = self.sessions.get(node_id)?.state;
        let next = transition(current, event)?;

        let session = self.sessions.get_mut(node_id)?;
        session.state = next;
        session.last_activity_at = self.clock.now_ms();
        if next == SessionState::Reconnecting {
            session.reconnect_count += 1;
        }

        if let Some(timers) = self.timers.get_mut(node_id) {
            timers.cancel();
        }
        self.timers.remove(node_id);

        for handler in self.state_change_handlers.snapshot() {
            handler(&StateChange { node_id: node_id.to_string(), from: current, to: next });
        }
        Some(next)
    }

    /// Register the cancellation tokens a caller is using to drive this
    /// node's `sessionTimeout`/`suspendTimeout`. The session manager itself
    /// is transport/runtime-agnostic; actual timer scheduling is the
    /// dispatcher's job, arming these tokens and calling `handle_event` with
    /// `SessionEvent::Timeout` when they fire. Cancel is idempotent because
    /// `CancellationToken::cancel` is idempotent.
    pub fn arm_timers(
        &mut self,
        node_id: &str,
        session_timer: CancellationToken,
        suspend_timer: CancellationToken,
    ) {
        if let Some(mut old) = self.timers.remove(node_id) {
            old.cancel();
        }
        let timers = Timers { session_timeout: Some(session_timer), suspend_timeout: Some(suspend_timer) };
        self.timers.insert(node_id.to_string(), timers);
    }

    pub fn session_timeout(&self) -> Duration {
        self.config.session_timeout
    }

    pub fn suspend_timeout(&self) -> Duration {
        self.config.suspend_timeout
    }

    pub fn get_session(&self, node_id: &str) -> Option<Session> {
        self.sessions.get(node_id).cloned()
    }

    pub fn get_all_sessions(&self) -> Vec<Session> {
        self.sessions.values().cloned().collect()
    }

    /// Cancel every outstanding timer. Leaves session state untouched.
    pub fn dispose(&mut self) {
        for (_, mut timers) in self.timers.drain() {
            timers.cancel();
        }
    }

    pub fn on_state_change(
        self_arc: &Arc<parking_lot::Mutex<Self>>,
        handler: impl Fn(&StateChange) + Send + Sync + 'static,
    ) -> Disposer<StateChangeHandler> {
        self_arc.lock().state_change_handlers.register(Arc::new(handler))
    }

    /// Snapshot all non-disconnected sessions.
    pub fn snapshot(&self, captured_at: EpochMs) -> SessionManagerSnapshot {
        let mut sessions: Vec<Session> =
            self.sessions.values().filter(|s| s.state != SessionState::Disconnected).cloned().collect();
        sessions.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        SessionManagerSnapshot { version: 1, captured_at, sessions }
    }

    /// Restore sessions from a snapshot. Clears current state first. No
    /// timers are installed by restore; they start only on the next event
    /// the dispatcher arms.
    pub fn restore(&mut self, snapshot: SessionManagerSnapshot) -> Result<()> {
        if snapshot.version != 1 {
            return Err(GatewayError::InvalidArgument);
        }
        self.dispose();
        self.sessions.clear();
        for session in snapshot.sessions {
            self.sessions.insert(session.node_id.clone(), session);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionManagerSnapshot {
    pub version: u32,
    pub captured_at: EpochMs,
    pub sessions: Vec<Session>,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
