// SPDX-License-Identifier: BUSL-1.1

//! Composite snapshot/restore over the conversation store,
//! Session Manager, and Delivery Tracker.

use serde::{Deserialize, Serialize};

use crate::clock::EpochMs;
use crate::conv_store::{ConversationStore, ConversationStoreSnapshot};
use crate::delivery::{DeliveryTracker, DeliveryTrackerSnapshot};
use crate::error::{GatewayError, Result};
use crate::session::{SessionManager, SessionManagerSnapshot};

/// Composite bundle over 4.D, 4.E, 4.F, captured under one version/timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub version: u32,
    pub captured_at: EpochMs,
    pub conversations: ConversationStoreSnapshot,
    pub sessions: SessionManagerSnapshot,
    pub delivery: DeliveryTrackerSnapshot,
}

/// Capture a consistent snapshot across all three components. Each
/// sub-snapshot is taken independently; callers holding the components
/// under their own locks are responsible for not interleaving mutations
/// mid-capture if stronger consistency is required.
pub fn capture(
    conversations: &ConversationStore,
    sessions: &SessionManager,
    delivery: &DeliveryTracker,
    captured_at: EpochMs,
) -> GatewaySnapshot {
    GatewaySnapshot {
        version: 1,
        captured_at,
        conversations: conversations.snapshot(captured_at),
        sessions: sessions.snapshot(captured_at),
        delivery: delivery.snapshot(captured_at),
    }
}

/// Restore all three components from a composite snapshot. Validates every
/// sub-snapshot's schema version before mutating anything, so a malformed
/// bundle leaves all three components untouched (no partial restore).
///
/// Restore order is Conversation Store, then Session Manager, then Delivery
/// Tracker — bindings may reference nodes whose session restores next;
/// the tracker references nodes by id only, so it can restore last.
pub fn restore(
    conversations: &mut ConversationStore,
    sessions: &mut SessionManager,
    delivery: &mut DeliveryTracker,
    snapshot: GatewaySnapshot,
) -> Result<()> {
    if snapshot.version != 1
        || snapshot.conversations.version != 1
        || snapshot.sessions.version != 1
        || snapshot.delivery.version != 1
    {
        return Err(GatewayError::InvalidArgument);
    }

    conversations.restore(snapshot.conversations)?;
    sessions.restore(snapshot.sessions)?;
    delivery.restore(snapshot.delivery)?;
    Ok(())
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
