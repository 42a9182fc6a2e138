// SPDX-License-Identifier: BUSL-1.1

//! Wire-facing data model: lanes, lane messages, conversation scopes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Dispatch priority lane. `Interrupt` bypasses queuing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Steer,
    Collect,
    Followup,
    Interrupt,
}

impl Lane {
    /// Numeric priority; lower drains first. `Interrupt` has no queued
    /// priority since it bypasses the buffer — callers must not compare it
    /// against [`Lane::priority`] of queued lanes.
    pub fn priority(self) -> u8 {
        match self {
            Lane::Steer => 0,
            Lane::Collect => 1,
            Lane::Followup => 2,
            Lane::Interrupt => u8::MAX,
        }
    }

    /// All lanes that are ever queued, in ascending priority order.
    pub fn queued_lanes() -> [Lane; 3] {
        [Lane::Steer, Lane::Collect, Lane::Followup]
    }
}

/// Requested kind of message, used by the conversation key resolver to
/// detect group-message dominance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Dm,
    Group,
}

/// Requested conversation scope for key resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationScope {
    Main,
    PerPeer,
    PerChannelPeer,
    PerAccountChannelPeer,
}

/// Optional routing context accompanying a `LaneMessage`, used to derive a
/// [`crate::conv_key::ConversationKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
}

/// A unit of work dispatched to a node. Immutable once dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneMessage {
    pub id: String,
    pub lane: Lane,
    pub channel_id: String,
    pub timestamp: u64,
    #[serde(default)]
    pub routing_context: Option<RoutingContext>,
    #[serde(with = "crate::b64_bytes")]
    pub payload: Bytes,
}

impl LaneMessage {
    /// Construct a message, failing fast the way the original spec requires
    /// for programming errors: an empty `id` is a caller bug, not a
    /// recoverable condition, so this panics rather than returning a result.
    pub fn new(
        id: impl Into<String>,
        lane: Lane,
        channel_id: impl Into<String>,
        timestamp: u64,
        payload: Bytes,
    ) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "LaneMessage::id must be non-empty");
        Self { id, lane, channel_id: channel_id.into(), timestamp, routing_context: None, payload }
    }

    pub fn with_routing_context(mut self, ctx: RoutingContext) -> Self {
        self.routing_context = Some(ctx);
        self
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
