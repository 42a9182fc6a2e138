// SPDX-License-Identifier: BUSL-1.1

//! Bounded conversation-to-node binding store with a reverse
//! index and TTL sweep.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::clock::EpochMs;
use crate::conv_key::ConversationKey;
use crate::error::{GatewayError, Result};
use crate::subscription::{Disposer, HandlerSet};

type CapacityWarningHandler = dyn Fn(CapacityWarning) + Send + Sync;

/// A binding from a conversation key to the node currently serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationBinding {
    pub conversation_key: String,
    pub node_id: String,
    pub created_at: EpochMs,
    pub last_active_at: EpochMs,
}

#[derive(Debug, Clone, Copy)]
pub struct CapacityWarning {
    pub size: usize,
    pub max_conversations: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ConversationStoreConfig {
    pub max_conversations: usize,
    pub conversation_ttl_ms: u64,
}

impl Default for ConversationStoreConfig {
    fn default() -> Self {
        Self { max_conversations: 100_000, conversation_ttl_ms: 24 * 60 * 60 * 1000 }
    }
}

/// On-wire snapshot of the store, used by the composite snapshot bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStoreSnapshot {
    pub version: u32,
    pub captured_at: EpochMs,
    pub bindings: Vec<ConversationBinding>,
}

const CAPACITY_WARNING_HIGH_WATER: f64 = 0.8;
const CAPACITY_WARNING_LOW_WATER: f64 = 0.7;

/// Bounded store maintaining `key -> binding` and `nodeId -> {key}` indices.
pub struct ConversationStore {
    config: ConversationStoreConfig,
    forward: HashMap<String, ConversationBinding>,
    reverse: HashMap<String, IndexSet<String>>,
    capacity_warning_armed: bool,
    capacity_warning_handlers: std::sync::Arc<HandlerSet<CapacityWarningHandler>>,
}

impl ConversationStore {
    pub fn new(config: ConversationStoreConfig) -> Self {
        Self {
            config,
            forward: HashMap::new(),
            reverse: HashMap::new(),
            capacity_warning_armed: true,
            capacity_warning_handlers: std::sync::Arc::new(HandlerSet::new()),
        }
    }

    pub fn size(&self) -> usize {
        self.forward.len()
    }

    pub fn update_config(&mut self, config: ConversationStoreConfig) {
        self.config = config;
    }

    /// Bind `key` to `node_id`. Idempotent: re-binding the same node only
    /// refreshes `last_active_at`. Re-binding a different node preserves
    /// `created_at` but moves the reverse-index entry. A new key at capacity
    /// evicts the least-recently-active existing binding first.
    pub fn bind(&mut self, key: &ConversationKey, node_id: &str, now: EpochMs) -> ConversationBinding {
        let key_str = key.as_str().to_string();

        if let Some(existing) = self.forward.get_mut(&key_str) {
            existing.last_active_at = now;
            if existing.node_id != node_id {
                let old_node = std::mem::replace(&mut existing.node_id, node_id.to_string());
                if let Some(set) = self.reverse.get_mut(&old_node) {
                    set.shift_remove(&key_str);
                    if set.is_empty() {
                        self.reverse.remove(&old_node);
                    }
                }
                self.reverse.entry(node_id.to_string()).or_default().insert(key_str.clone());
            }
            let binding = existing.clone();
            self.check_capacity_warning();
            return binding;
        }

        if self.forward.len() >= self.config.max_conversations {
            self.evict_least_active();
        }

        let binding = ConversationBinding {
            conversation_key: key_str.clone(),
            node_id: node_id.to_string(),
            created_at: now,
            last_active_at: now,
        };
        self.forward.insert(key_str.clone(), binding.clone());
        self.reverse.entry(node_id.to_string()).or_default().insert(key_str);
        self.check_capacity_warning();
        binding
    }

    pub fn get(&self, key: &ConversationKey) -> Option<ConversationBinding> {
        self.forward.get(key.as_str()).cloned()
    }

    /// Remove every binding owned by `node_id`, returning the count removed.
    pub fn remove_node(&mut self, node_id: &str) -> usize {
        let Some(keys) = self.reverse.remove(node_id) else {
            return 0;
        };
        for key in &keys {
            self.forward.remove(key);
        }
        self.check_capacity_warning();
        keys.len()
    }

    /// Remove bindings idle for at least `conversation_ttl_ms`, returning the
    /// count removed.
    pub fn sweep(&mut self, now: EpochMs) -> usize {
        let ttl = self.config.conversation_ttl_ms;
        let expired: Vec<String> = self
            .forward
            .values()
            .filter(|b| now.saturating_sub(b.last_active_at) >= ttl)
            .map(|b| b.conversation_key.clone())
            .collect();

        for key in &expired {
            if let Some(binding) = self.forward.remove(key) {
                if let Some(set) = self.reverse.get_mut(&binding.node_id) {
                    set.shift_remove(key);
                    if set.is_empty() {
                        self.reverse.remove(&binding.node_id);
                    }
                }
            }
        }
        self.check_capacity_warning();
        expired.len()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.capacity_warning_armed = true;
    }

    pub fn on_capacity_warning(
        self_arc: &std::sync::Arc<parking_lot::Mutex<Self>>,
        handler: impl Fn(CapacityWarning) + Send + Sync + 'static,
    ) -> Disposer<CapacityWarningHandler> {
        self_arc.lock().capacity_warning_handlers.register(std::sync::Arc::new(handler))
    }

    fn evict_least_active(&mut self) {
        let Some(oldest_key) = self
            .forward
            .values()
            .min_by_key(|b| b.last_active_at)
            .map(|b| b.conversation_key.clone())
        else {
            return;
        };
        if let Some(binding) = self.forward.remove(&oldest_key) {
            if let Some(set) = self.reverse.get_mut(&binding.node_id) {
                set.shift_remove(&oldest_key);
                if set.is_empty() {
                    self.reverse.remove(&binding.node_id);
                }
            }
        }
    }

    fn check_capacity_warning(&mut self) {
        if self.config.max_conversations == 0 {
            return;
        }
        let ratio = self.forward.len() as f64 / self.config.max_conversations as f64;
        if self.capacity_warning_armed && ratio >= CAPACITY_WARNING_HIGH_WATER {
            self.capacity_warning_armed = false;
            for handler in self.capacity_warning_handlers.snapshot() {
                handler(CapacityWarning {
                    size: self.forward.len(),
                    max_conversations: self.config.max_conversations,
                });
            }
        } else if !self.capacity_warning_armed && ratio < CAPACITY_WARNING_LOW_WATER {
            self.capacity_warning_armed = true;
        }
    }

    /// Check the reverse index is exactly the multimap induced by the
    /// forward index. Used by property tests; not a hot-path call.
    pub fn reverse_index_is_consistent(&self) -> bool {
        let mut expected: HashMap<&str, IndexSet<&str>> = HashMap::new();
        for binding in self.forward.values() {
            expected
                .entry(binding.node_id.as_str())
                .or_default()
                .insert(binding.conversation_key.as_str());
        }
        if expected.len() != self.reverse.len() {
            return false;
        }
        for (node_id, keys) in &expected {
            let Some(actual) = self.reverse.get(*node_id) else {
                return false;
            };
            if actual.len() != keys.len() {
                return false;
            }
            if !keys.iter().all(|k| actual.contains(*k)) {
                return false;
            }
        }
        true
    }

    pub fn snapshot(&self, captured_at: EpochMs) -> ConversationStoreSnapshot {
        let mut bindings: Vec<ConversationBinding> = self.forward.values().cloned().collect();
        bindings.sort_by(|a, b| a.conversation_key.cmp(&b.conversation_key));
        ConversationStoreSnapshot { version: 1, captured_at, bindings }
    }

    /// Restore from a snapshot: clears current state, validates the schema
    /// version, then rebuilds both indices.
    pub fn restore(&mut self, snapshot: ConversationStoreSnapshot) -> Result<()> {
        if snapshot.version != 1 {
            return Err(GatewayError::InvalidArgument);
        }
        let mut forward = HashMap::with_capacity(snapshot.bindings.len());
        let mut reverse: HashMap<String, IndexSet<String>> = HashMap::new();
        for binding in snapshot.bindings {
            reverse.entry(binding.node_id.clone()).or_default().insert(binding.conversation_key.clone());
            forward.insert(binding.conversation_key.clone(), binding);
        }
        self.forward = forward;
        self.reverse = reverse;
        self.capacity_warning_armed = true;
        self.check_capacity_warning();
        Ok(())
    }
}

#[cfg(test)]
#[path = "conv_store_tests.rs"]
mod tests;
