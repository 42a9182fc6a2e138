// SPDX-License-Identifier: BUSL-1.1

//! Wire frame codec: newline-delimited JSON frames over a
//! single bidirectional WebSocket stream per node.

use edge_gateway_core::LaneMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    Suspend,
    Resume,
    Disconnect,
}

/// A single frame exchanged over the node transport stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Server -> node: a unit of work to process.
    Dispatch { message: LaneMessage },
    /// Either direction: acknowledges a previously dispatched message.
    Ack { message_id: String },
    /// Node -> server: a reply to a prior dispatch.
    Inbound { message_id: String, channel_id: String, payload: serde_json::Value },
    /// Either direction: a session lifecycle signal.
    SessionEvent { event: SessionEventKind },
    Ping,
    Pong,
}

impl Frame {
    /// Encode this frame as one newline-delimited JSON line (no trailing
    /// newline; callers append it when writing to the transport).
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(line: &str) -> Result<Frame, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
