// SPDX-License-Identifier: BUSL-1.1

//! Connection dispatcher: routes adapter events through key
//! resolution (4.C), conversation binding (4.D), and the per-node priority
//! buffer (4.B); tracks delivery (4.F); drives session (4.E) and circuit
//! (4.G) state off inbound traffic and transport failures.
//!
//! This module holds the pure orchestration logic, kept independent of the
//! actual transport so it is unit-testable without a live WebSocket. The
//! reader/writer loops in `transport::ws` call into these functions.

use std::sync::Arc;

use edge_gateway_core::{
    ConversationKey, GatewayError, LaneMessage, PendingMessage, Result, SessionEvent, SessionState,
};
use tracing::{debug, info, warn};

use crate::state::GatewayState;

/// Pick which connected node a brand-new conversation key should bind to:
/// the node with the fewest pending deliveries, ties broken by node id so
/// the choice is deterministic for a given key and cluster snapshot.
pub fn choose_node_for_key(state: &GatewayState, _key: &ConversationKey) -> Option<String> {
    let nodes = state.nodes.read();
    nodes
        .keys()
        .cloned()
        .min_by_key(|node_id| (state.pending_count(node_id), node_id.clone()))
}

/// Handle an adapter event: resolve its conversation key, bind (or look up)
/// the owning node, enqueue the message into that node's priority buffer,
/// and wake its writer.
///
/// `preferred_node` lets a caller (e.g. a reply continuing an existing
/// conversation) pin routing to a specific node; when `None`, a new
/// binding is routed via [`choose_node_for_key`].
pub async fn route_message(
    state: &Arc<GatewayState>,
    key: &ConversationKey,
    preferred_node: Option<&str>,
    message: LaneMessage,
) -> Result<()> {
    let existing = state.conversations.lock().get(key);
    let node_id = match (existing, preferred_node) {
        (Some(binding), _) => binding.node_id,
        (None, Some(preferred)) => preferred.to_string(),
        (None, None) => choose_node_for_key(state, key).ok_or(GatewayError::Unavailable)?,
    };

    let Some(entry) = state.node(&node_id) else {
        return Err(GatewayError::NotFound);
    };

    let now = state.clock.now_ms();
    state.conversations.lock().bind(key, &node_id, now);

    entry.lane_buffer.lock().dispatch(message);
    let _ = entry.wake_tx.try_send(());

    debug!(node_id = %node_id, conversation_key = %key, "routed message to node");
    Ok(())
}

/// Called by a node's writer loop just before it hands a message to the
/// transport: records it as pending in the delivery tracker.
pub fn track_dispatched(state: &GatewayState, node_id: &str, message: &LaneMessage) {
    state.delivery.lock().track(
        node_id,
        PendingMessage {
            message_id: message.id.clone(),
            node_id: node_id.to_string(),
            sent_at: state.clock.now_ms(),
            message: message.clone(),
        },
    );
}

/// Handle an inbound `Ack` frame: marks the message delivered and refreshes
/// the node's session activity.
pub fn handle_ack(state: &Arc<GatewayState>, node_id: &str, message_id: &str) -> bool {
    let acked = state.delivery.lock().ack(node_id, message_id);
    if acked {
        handle_session_event(state, node_id, SessionEvent::Activity);
    }
    acked
}

/// Handle any inbound traffic (reply or heartbeat) as session activity.
pub fn handle_activity(state: &Arc<GatewayState>, node_id: &str) {
    handle_session_event(state, node_id, SessionEvent::Activity);
}

/// Apply a session event, then continue the timer-driven lifecycle: a
/// session that is still alive gets its idle/suspend timer re-armed for
/// whatever state it ended up in; a session that became disconnected has
/// its node evicted, the same cleanup a transport failure or an explicit
/// disconnect frame goes through.
pub fn handle_session_event(
    state: &Arc<GatewayState>,
    node_id: &str,
    event: SessionEvent,
) -> Option<SessionState> {
    let next = state.sessions.lock().handle_event(node_id, event)?;
    match next {
        SessionState::Disconnected => state.evict_node(node_id),
        _ => arm_session_timer(state, node_id),
    }
    Some(next)
}

/// Arm this node's idle/suspend timer for its current session state,
/// replacing whatever timer was previously armed. `connected` sessions run
/// against `sessionTimeout`; `suspended` and `reconnecting` sessions run
/// against `suspendTimeout` — a resumed-but-not-yet-reconnected session is
/// still working the same recovery budget a suspended one is. A fired
/// timer feeds `SessionEvent::Timeout` back through [`handle_session_event`],
/// which is what lets the lifecycle chain connected -> suspended ->
/// disconnected entirely off these timers when no traffic arrives.
pub fn arm_session_timer(state: &Arc<GatewayState>, node_id: &str) {
    let duration = {
        let manager = state.sessions.lock();
        let Some(session) = manager.get_session(node_id) else { return };
        match session.state {
            SessionState::Connected => manager.session_timeout(),
            SessionState::Suspended | SessionState::Reconnecting => manager.suspend_timeout(),
            SessionState::Disconnected => return,
        }
    };

    let Some(entry) = state.node(node_id) else { return };
    let token = entry.cancel.child_token();
    state.sessions.lock().arm_timers(node_id, token.clone(), token.clone());

    let state = Arc::clone(state);
    let node_id = node_id.to_string();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(duration) => {
                handle_session_event(&state, &node_id, SessionEvent::Timeout);
            }
        }
    });
}

/// A reply a node sent back over `Frame::Inbound`, handed to whatever
/// handler was registered via [`GatewayState::on_reply`] at construction.
#[derive(Debug, Clone)]
pub struct InboundReply {
    pub node_id: String,
    pub message_id: String,
    pub channel_id: String,
    pub payload: serde_json::Value,
}

/// Handle an inbound reply: refresh session activity and route the reply
/// to the handler(s) registered at construction.
pub fn handle_inbound_reply(state: &Arc<GatewayState>, reply: InboundReply) {
    handle_activity(state, &reply.node_id);
    state.notify_reply(&reply);
}

/// Record a transport failure on the node's circuit breaker. If the
/// circuit opens as a result, the node's session is told to disconnect and
/// the node is evicted (its bindings removed, its pending discarded — not
/// re-routed).
pub fn handle_transport_error(state: &Arc<GatewayState>, node_id: &str) {
    let Some(entry) = state.node(node_id) else {
        return;
    };
    let opened = {
        let mut circuit = entry.circuit.lock();
        let was_open = circuit.is_open();
        circuit.record_failure();
        !was_open && circuit.is_open()
    };

    if opened {
        warn!(node_id, "circuit opened after transport failure, disconnecting node");
        handle_session_event(state, node_id, SessionEvent::Disconnect);
    }
}

/// Record a transport success (e.g. a flushed write), resetting the
/// node's circuit breaker failure count.
pub fn handle_transport_success(state: &GatewayState, node_id: &str) {
    if let Some(entry) = state.node(node_id) {
        entry.circuit.lock().record_success();
    }
}

/// Accept a new node connection: create its session, register it in
/// gateway state, arm its idle timer, and return the node's runtime entry.
pub fn accept_node(
    state: &Arc<GatewayState>,
    node_id: &str,
    wake_tx: tokio::sync::mpsc::Sender<()>,
) -> Result<Arc<crate::state::NodeEntry>> {
    state.sessions.lock().create_session(node_id, None)?;
    let entry = state.register_node(node_id, wake_tx);
    arm_session_timer(state, node_id);
    info!(node_id, "node connected");
    Ok(entry)
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
