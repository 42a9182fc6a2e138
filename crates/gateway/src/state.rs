// SPDX-License-Identifier: BUSL-1.1

//! Shared gateway state: the live config handle plus the core components
//! (4.B-4.G, composed via 4.I) keyed per connected node.

use std::collections::HashMap;
use std::sync::Arc;

use edge_gateway_core::{
    CircuitBreaker, CircuitBreakerConfig, ConversationStore, ConversationStoreConfig, DeliveryTracker,
    Disposer, HandlerSet, LaneBuffer, SessionManager, SessionManagerConfig, SharedClock,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::dispatcher::InboundReply;

type ReplyHandler = dyn Fn(&InboundReply) + Send + Sync;

/// Per-node runtime state: the priority buffer feeding its writer loop, the
/// circuit breaker guarding its transport, and a handle to wake its writer
/// task when new work is enqueued.
pub struct NodeEntry {
    pub node_id: String,
    pub lane_buffer: Arc<Mutex<LaneBuffer>>,
    pub circuit: Arc<Mutex<CircuitBreaker>>,
    pub wake_tx: mpsc::Sender<()>,
    pub cancel: CancellationToken,
}

/// Shared gateway state, cloned into every request/connection handler as an
/// `Arc`.
pub struct GatewayState {
    pub config: Arc<RwLock<GatewayConfig>>,
    pub shutdown: CancellationToken,
    pub clock: SharedClock,

    pub nodes: RwLock<HashMap<String, Arc<NodeEntry>>>,
    pub conversations: Arc<Mutex<ConversationStore>>,
    pub sessions: Arc<Mutex<SessionManager>>,
    pub delivery: Arc<Mutex<DeliveryTracker>>,

    pub admission: Arc<tokio::sync::Semaphore>,
    reply_handlers: Arc<HandlerSet<ReplyHandler>>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, shutdown: CancellationToken, clock: SharedClock) -> Self {
        let conversations = Arc::new(Mutex::new(ConversationStore::new(ConversationStoreConfig {
            max_conversations: config.max_conversations,
            conversation_ttl_ms: config.conversation_ttl_ms,
        })));
        let sessions = Arc::new(Mutex::new(SessionManager::new(
            Arc::clone(&clock),
            SessionManagerConfig {
                session_timeout: config.session_timeout(),
                suspend_timeout: config.suspend_timeout(),
            },
        )));
        let delivery = Arc::new(Mutex::new(DeliveryTracker::new(1024)));
        let admission = Arc::new(tokio::sync::Semaphore::new(config.max_connections));

        Self {
            config: Arc::new(RwLock::new(config)),
            shutdown,
            clock,
            nodes: RwLock::new(HashMap::new()),
            conversations,
            sessions,
            delivery,
            admission,
            reply_handlers: Arc::new(HandlerSet::new()),
        }
    }

    /// Register a handler invoked for every inbound reply a node sends back
    /// (the "handler provided at construction" the dispatcher routes
    /// replies to). Multiple handlers may be registered; each disposer is
    /// independent.
    pub fn on_reply(
        &self,
        handler: impl Fn(&InboundReply) + Send + Sync + 'static,
    ) -> Disposer<ReplyHandler> {
        self.reply_handlers.register(Arc::new(handler))
    }

    pub(crate) fn notify_reply(&self, reply: &InboundReply) {
        for handler in self.reply_handlers.snapshot() {
            handler(reply);
        }
    }

    pub fn lane_capacity(&self) -> usize {
        self.config.read().lane_capacity
    }

    /// Register a freshly connected node, creating its priority buffer and
    /// circuit breaker.
    pub fn register_node(&self, node_id: &str, wake_tx: mpsc::Sender<()>) -> Arc<NodeEntry> {
        let entry = Arc::new(NodeEntry {
            node_id: node_id.to_string(),
            lane_buffer: Arc::new(Mutex::new(LaneBuffer::new(self.lane_capacity()))),
            circuit: Arc::new(Mutex::new(CircuitBreaker::new(
                Arc::clone(&self.clock),
                CircuitBreakerConfig { threshold: 3, cooldown_ms: 10_000 },
            ))),
            wake_tx,
            cancel: self.shutdown.child_token(),
        });
        self.nodes.write().insert(node_id.to_string(), Arc::clone(&entry));
        entry
    }

    pub fn node(&self, node_id: &str) -> Option<Arc<NodeEntry>> {
        self.nodes.read().get(node_id).cloned()
    }

    /// Evict a node: cancel its writer/reader tasks, remove its conversation
    /// bindings, and discard (not re-route) its undelivered messages.
    pub fn evict_node(&self, node_id: &str) {
        if let Some(entry) = self.nodes.write().remove(node_id) {
            entry.cancel.cancel();
        }
        self.conversations.lock().remove_node(node_id);
        self.delivery.lock().discard_node(node_id);
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.lock().size()
    }

    pub fn pending_count(&self, node_id: &str) -> usize {
        self.delivery.lock().pending_count(node_id)
    }

    pub fn circuit_state(&self, node_id: &str) -> Option<edge_gateway_core::CircuitPhase> {
        self.node(node_id).map(|entry| entry.circuit.lock().current_state())
    }

    pub fn active_connections(&self) -> usize {
        self.nodes.read().len()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
