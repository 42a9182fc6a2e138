// SPDX-License-Identifier: BUSL-1.1

//! Per-node unacked-message tracking with drop-oldest
//! overflow.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::EpochMs;
use crate::error::{GatewayError, Result};
use crate::message::LaneMessage;
use crate::subscription::{Disposer, HandlerSet};

type OverflowHandler = dyn Fn(&str, &PendingMessage) + Send + Sync;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMessage {
    pub message_id: String,
    pub node_id: String,
    pub sent_at: EpochMs,
    pub message: LaneMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTrackerSnapshot {
    pub version: u32,
    pub captured_at: EpochMs,
    pub pending: Vec<PendingMessage>,
}

/// Tracks sent-but-unacknowledged messages per node, each node capped at
/// `max_per_node` with drop-oldest overflow.
pub struct DeliveryTracker {
    max_per_node: usize,
    pending: HashMap<String, Vec<PendingMessage>>,
    overflow_handlers: Arc<HandlerSet<OverflowHandler>>,
}

impl DeliveryTracker {
    pub fn new(max_per_node: usize) -> Self {
        Self { max_per_node: max_per_node.max(1), pending: HashMap::new(), overflow_handlers: Arc::new(HandlerSet::new()) }
    }

    /// Append a pending message to `node_id`'s list. If this pushes the
    /// node past `max_per_node`, the oldest pending message is dropped and
    /// reported to overflow handlers.
    pub fn track(&mut self, node_id: &str, message: PendingMessage) {
        let list = self.pending.entry(node_id.to_string()).or_default();
        list.push(message);
        if list.len() > self.max_per_node {
            let dropped = list.remove(0);
            for handler in self.overflow_handlers.snapshot() {
                handler(node_id, &dropped);
            }
        }
    }

    /// Ack the first pending message matching `message_id` for `node_id`.
    /// Returns whether a match was found.
    pub fn ack(&mut self, node_id: &str, message_id: &str) -> bool {
        let Some(list) = self.pending.get_mut(node_id) else {
            return false;
        };
        if let Some(pos) = list.iter().position(|p| p.message_id == message_id) {
            list.remove(pos);
            if list.is_empty() {
                self.pending.remove(node_id);
            }
            true
        } else {
            false
        }
    }

    pub fn unacked(&self, node_id: &str) -> Vec<PendingMessage> {
        self.pending.get(node_id).cloned().unwrap_or_default()
    }

    pub fn pending_count(&self, node_id: &str) -> usize {
        self.pending.get(node_id).map(|l| l.len()).unwrap_or(0)
    }

    /// Discard every pending message for `node_id` without acking, per the
    /// dispatcher's eviction policy — they are not re-routed.
    pub fn discard_node(&mut self, node_id: &str) -> usize {
        self.pending.remove(node_id).map(|l| l.len()).unwrap_or(0)
    }

    /// Return pending messages across all nodes that have been unacked for
    /// at least `timeout_ms`, without removing them.
    pub fn sweep(&self, now: EpochMs, timeout_ms: u64) -> Vec<PendingMessage> {
        self.pending
            .values()
            .flatten()
            .filter(|p| now.saturating_sub(p.sent_at) >= timeout_ms)
            .cloned()
            .collect()
    }

    pub fn on_overflow(
        self_arc: &Arc<parking_lot::Mutex<Self>>,
        handler: impl Fn(&str, &PendingMessage) + Send + Sync + 'static,
    ) -> Disposer<OverflowHandler> {
        self_arc.lock().overflow_handlers.register(Arc::new(handler))
    }

    pub fn snapshot(&self, captured_at: EpochMs) -> DeliveryTrackerSnapshot {
        let mut pending: Vec<PendingMessage> = self.pending.values().flatten().cloned().collect();
        pending.sort_by(|a, b| (a.node_id.as_str(), a.sent_at).cmp(&(b.node_id.as_str(), b.sent_at)));
        DeliveryTrackerSnapshot { version: 1, captured_at, pending }
    }

    pub fn restore(&mut self, snapshot: DeliveryTrackerSnapshot) -> Result<()> {
        if snapshot.version != 1 {
            return Err(GatewayError::InvalidArgument);
        }
        self.pending.clear();
        for message in snapshot.pending {
            self.pending.entry(message.node_id.clone()).or_default().push(message);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
