// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::clock::FakeClock;

fn breaker(clock: Arc<FakeClock>) -> CircuitBreaker {
    CircuitBreaker::new(clock, CircuitBreakerConfig { threshold: 2, cooldown_ms: 1000 })
}

/// Two failures open the breaker; after the cooldown it observes
/// half-open; the first probe is allowed, the second is not; a success
/// closes it.
#[test]
fn circuit_breaker_opens_then_half_opens_then_closes() {
    let clock = Arc::new(FakeClock::new(0));
    let mut cb = breaker(Arc::clone(&clock));

    cb.record_failure();
    assert_eq!(cb.current_state(), CircuitPhase::Closed);
    cb.record_failure();
    assert_eq!(cb.current_state(), CircuitPhase::Open);

    clock.advance(Duration::from_millis(1000));
    assert_eq!(cb.current_state(), CircuitPhase::HalfOpen);

    assert!(cb.allows_probe());
    assert!(!cb.allows_probe());

    cb.record_success();
    assert_eq!(cb.current_state(), CircuitPhase::Closed);
    assert_eq!(cb.failures(), 0);
}

#[test]
fn success_before_threshold_resets_failure_count() {
    let clock = Arc::new(FakeClock::new(0));
    let mut cb = breaker(clock);

    cb.record_failure();
    cb.record_success();
    assert_eq!(cb.failures(), 0);

    cb.record_failure();
    assert_eq!(cb.current_state(), CircuitPhase::Closed, "single failure after reset must not open");
}

#[test]
fn cooldown_not_yet_elapsed_stays_open() {
    let clock = Arc::new(FakeClock::new(0));
    let mut cb = breaker(Arc::clone(&clock));
    cb.record_failure();
    cb.record_failure();
    assert_eq!(cb.current_state(), CircuitPhase::Open);

    clock.advance(Duration::from_millis(999));
    assert_eq!(cb.current_state(), CircuitPhase::Open);
}

#[test]
fn failure_during_half_open_reopens_and_resets_cooldown() {
    let clock = Arc::new(FakeClock::new(0));
    let mut cb = breaker(Arc::clone(&clock));
    cb.record_failure();
    cb.record_failure();
    clock.advance(Duration::from_millis(1000));
    assert_eq!(cb.current_state(), CircuitPhase::HalfOpen);

    cb.record_failure();
    assert_eq!(cb.current_state(), CircuitPhase::Open);

    // Cooldown restarted from the new opened_at, so it should not yet be
    // half-open one ms later even though the original window elapsed.
    clock.advance(Duration::from_millis(1));
    assert_eq!(cb.current_state(), CircuitPhase::Open);

    clock.advance(Duration::from_millis(999));
    assert_eq!(cb.current_state(), CircuitPhase::HalfOpen);
}

#[test]
fn allows_probe_false_when_closed_or_open() {
    let clock = Arc::new(FakeClock::new(0));
    let mut cb = breaker(Arc::clone(&clock));
    assert!(!cb.allows_probe());

    cb.record_failure();
    cb.record_failure();
    assert!(!cb.allows_probe());
}

#[test]
fn is_open_reflects_settled_state() {
    let clock = Arc::new(FakeClock::new(0));
    let mut cb = breaker(Arc::clone(&clock));
    assert!(!cb.is_open());
    cb.record_failure();
    cb.record_failure();
    assert!(cb.is_open());
    clock.advance(Duration::from_millis(1000));
    assert!(!cb.is_open(), "half-open is not open");
}
