// SPDX-License-Identifier: BUSL-1.1

//! Per-destination circuit breaker with a pluggable clock.

use serde::{Deserialize, Serialize};

use crate::clock::{EpochMs, SharedClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPhase {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub threshold: u32,
    pub cooldown_ms: u64,
}

/// A single circuit breaker. `current_state` performs the clock-driven
/// open -> half-open transition lazily and idempotently on read.
pub struct CircuitBreaker {
    clock: SharedClock,
    config: CircuitBreakerConfig,
    phase: CircuitPhase,
    failures: u32,
    opened_at: Option<EpochMs>,
    probe_in_flight: bool,
    probe_issued_this_half_open: bool,
}

impl CircuitBreaker {
    pub fn new(clock: SharedClock, config: CircuitBreakerConfig) -> Self {
        Self {
            clock,
            config,
            phase: CircuitPhase::Closed,
            failures: 0,
            opened_at: None,
            probe_in_flight: false,
            probe_issued_this_half_open: false,
        }
    }

    /// Re-evaluate whether an `open` breaker's cooldown has elapsed, moving
    /// it to `half-open` if so. Called before every state read.
    fn settle(&mut self) {
        if self.phase == CircuitPhase::Open {
            if let Some(opened_at) = self.opened_at {
                if self.clock.now_ms().saturating_sub(opened_at) >= self.config.cooldown_ms {
                    self.phase = CircuitPhase::HalfOpen;
                    self.probe_issued_this_half_open = false;
                }
            }
        }
    }

    pub fn current_state(&mut self) -> CircuitPhase {
        self.settle();
        self.phase
    }

    pub fn is_open(&mut self) -> bool {
        self.current_state() == CircuitPhase::Open
    }

    /// Returns true exactly once per half-open window; false otherwise.
    pub fn allows_probe(&mut self) -> bool {
        self.settle();
        if self.phase != CircuitPhase::HalfOpen || self.probe_issued_this_half_open {
            return false;
        }
        self.probe_issued_this_half_open = true;
        self.probe_in_flight = true;
        true
    }

    pub fn record_success(&mut self) {
        self.settle();
        self.failures = 0;
        self.phase = CircuitPhase::Closed;
        self.opened_at = None;
        self.probe_in_flight = false;
        self.probe_issued_this_half_open = false;
    }

    pub fn record_failure(&mut self) {
        self.settle();
        self.probe_in_flight = false;
        match self.phase {
            CircuitPhase::HalfOpen => {
                self.phase = CircuitPhase::Open;
                self.opened_at = Some(self.clock.now_ms());
                self.failures += 1;
            }
            CircuitPhase::Closed => {
                self.failures += 1;
                if self.failures >= self.config.threshold {
                    self.phase = CircuitPhase::Open;
                    self.opened_at = Some(self.clock.now_ms());
                }
            }
            CircuitPhase::Open => {
                self.failures += 1;
                self.opened_at = Some(self.clock.now_ms());
            }
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
#[path = "circuit_tests.rs"]
mod tests;
