// SPDX-License-Identifier: BUSL-1.1

//! Injectable clock so timer-driven components (session timeouts, circuit
//! breaker cooldowns, conversation TTL sweeps) can be driven by a fake clock
//! in tests instead of real wall-clock time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Milliseconds since the Unix epoch.
pub type EpochMs = u64;

/// Abstraction over time reads, used by every timer-driven core component.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> EpochMs;
}

/// Real wall-clock implementation, backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only advances when told to. Tests substitute this for
/// `SystemClock` to deterministically drive timeouts and cooldowns.
#[derive(Debug, Clone)]
pub struct FakeClock {
    now_ms: Arc<Mutex<EpochMs>>,
}

impl FakeClock {
    pub fn new(start_ms: EpochMs) -> Self {
        Self { now_ms: Arc::new(Mutex::new(start_ms)) }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now_ms.lock();
        *now += by.as_millis() as u64;
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now_ms: EpochMs) {
        *self.now_ms.lock() = now_ms;
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> EpochMs {
        *self.now_ms.lock()
    }
}

/// A shared, type-erased clock handle passed into core components.
pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
