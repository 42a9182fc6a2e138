// SPDX-License-Identifier: BUSL-1.1

//! Process-wide connection admission control.
//!
//! A bounded `tokio::sync::Semaphore` gates how many nodes may be
//! simultaneously connected. Exhaustion at the handshake layer is reported
//! as a 503-equivalent rather than blocking indefinitely.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// How long an incoming handshake waits for a connection slot before
/// giving up and reporting `Unavailable`.
const ADMISSION_WAIT: Duration = Duration::from_millis(250);

/// Try to admit one more connection, waiting up to a short grace period
/// for a slot to free up under transient churn. Returns `None` if no slot
/// became available in time.
pub async fn try_admit(semaphore: &Arc<Semaphore>) -> Option<OwnedSemaphorePermit> {
    tokio::time::timeout(ADMISSION_WAIT, Arc::clone(semaphore).acquire_owned()).await.ok()?.ok()
}

#[cfg(test)]
#[path = "semaphore_tests.rs"]
mod tests;
