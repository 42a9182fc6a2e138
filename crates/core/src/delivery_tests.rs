// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::*;
use crate::message::Lane;

fn pending(id: &str, node_id: &str, sent_at: EpochMs) -> PendingMessage {
    PendingMessage {
        message_id: id.to_string(),
        node_id: node_id.to_string(),
        sent_at,
        message: LaneMessage::new(id, Lane::Steer, "chan", sent_at, Bytes::new()),
    }
}

#[test]
fn track_and_ack_round_trip() {
    let mut t = DeliveryTracker::new(10);
    t.track("node-1", pending("m1", "node-1", 0));
    assert_eq!(t.pending_count("node-1"), 1);
    assert!(t.ack("node-1", "m1"));
    assert_eq!(t.pending_count("node-1"), 0);
}

#[test]
fn ack_unknown_message_returns_false() {
    let mut t = DeliveryTracker::new(10);
    t.track("node-1", pending("m1", "node-1", 0));
    assert!(!t.ack("node-1", "does-not-exist"));
    assert!(!t.ack("node-2", "m1"));
}

#[test]
fn overflow_drops_oldest_and_notifies() {
    let t = Arc::new(Mutex::new(DeliveryTracker::new(2)));
    let dropped_ids = Arc::new(Mutex::new(Vec::new()));
    let dropped_clone = Arc::clone(&dropped_ids);
    let _disposer = DeliveryTracker::on_overflow(&t, move |_node, msg| {
        dropped_clone.lock().push(msg.message_id.clone());
    });

    t.lock().track("node-1", pending("m1", "node-1", 0));
    t.lock().track("node-1", pending("m2", "node-1", 1));
    t.lock().track("node-1", pending("m3", "node-1", 2));

    assert_eq!(t.lock().pending_count("node-1"), 2);
    assert_eq!(*dropped_ids.lock(), vec!["m1".to_string()]);
    let remaining: Vec<String> = t.lock().unacked("node-1").into_iter().map(|p| p.message_id).collect();
    assert_eq!(remaining, vec!["m2", "m3"]);
}

#[test]
fn sweep_returns_pending_past_timeout_without_removing() {
    let mut t = DeliveryTracker::new(10);
    t.track("node-1", pending("m1", "node-1", 0));
    t.track("node-1", pending("m2", "node-1", 900));

    let timed_out = t.sweep(1000, 500);
    assert_eq!(timed_out.len(), 1);
    assert_eq!(timed_out[0].message_id, "m1");
    assert_eq!(t.pending_count("node-1"), 2, "sweep must not remove entries itself");
}

#[test]
fn discard_node_drops_all_without_acking() {
    let mut t = DeliveryTracker::new(10);
    t.track("node-1", pending("m1", "node-1", 0));
    t.track("node-1", pending("m2", "node-1", 1));
    assert_eq!(t.discard_node("node-1"), 2);
    assert_eq!(t.pending_count("node-1"), 0);
}

#[test]
fn snapshot_round_trips_through_restore() {
    let mut t = DeliveryTracker::new(10);
    t.track("node-1", pending("m1", "node-1", 0));
    t.track("node-2", pending("m2", "node-2", 1));

    let snap = t.snapshot(5000);
    assert_eq!(snap.pending.len(), 2);

    let mut restored = DeliveryTracker::new(10);
    restored.restore(snap).unwrap();
    assert_eq!(restored.pending_count("node-1"), 1);
    assert_eq!(restored.pending_count("node-2"), 1);
}

#[test]
fn restore_rejects_unknown_schema_version() {
    let mut t = DeliveryTracker::new(10);
    let bad = DeliveryTrackerSnapshot { version: 7, captured_at: 0, pending: vec![] };
    assert!(matches!(t.restore(bad), Err(GatewayError::InvalidArgument)));
}

#[test]
fn pending_count_never_exceeds_max_per_node() {
    let mut t = DeliveryTracker::new(3);
    for i in 0..20 {
        t.track("node-1", pending(&format!("m{i}"), "node-1", i as u64));
        assert!(t.pending_count("node-1") <= 3);
    }
}

#[test]
fn overflow_handler_count_matches_tracked_drops() {
    let t = Arc::new(Mutex::new(DeliveryTracker::new(1)));
    let drops = Arc::new(AtomicUsize::new(0));
    let drops_clone = Arc::clone(&drops);
    let _disposer = DeliveryTracker::on_overflow(&t, move |_, _| {
        drops_clone.fetch_add(1, Ordering::Relaxed);
    });
    for i in 0..5 {
        t.lock().track("node-1", pending(&format!("m{i}"), "node-1", i as u64));
    }
    assert_eq!(drops.load(Ordering::Relaxed), 4);
}
