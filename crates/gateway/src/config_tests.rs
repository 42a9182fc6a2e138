// SPDX-License-Identifier: BUSL-1.1

use super::*;

/// Static-assertion-style check: a field must never appear in both the
/// hot-reloadable and restart-required partitions.
#[test]
fn hot_and_restart_required_fields_are_disjoint() {
    for field in GatewayConfig::hot_fields() {
        assert!(
            !GatewayConfig::restart_required_fields().contains(field),
            "field {field} appears in both partitions"
        );
    }
}

#[test]
fn every_field_is_classified() {
    let classified: Vec<&str> =
        GatewayConfig::hot_fields().iter().chain(GatewayConfig::restart_required_fields()).copied().collect();
    let all_fields = [
        "port",
        "nexus_url",
        "nexus_api_key",
        "max_connections",
        "session_timeout_ms",
        "suspend_timeout_ms",
        "health_check_interval_ms",
        "lane_capacity",
        "max_frames_per_second",
        "max_conversations",
        "conversation_ttl_ms",
        "default_conversation_scope",
    ];
    for field in all_fields {
        assert!(classified.contains(&field), "field {field} is not classified as hot or restart-required");
    }
}

#[test]
fn defaults_match_spec() {
    let config = GatewayConfig::default();
    assert_eq!(config.session_timeout_ms, 60_000);
    assert_eq!(config.suspend_timeout_ms, 300_000);
    assert_eq!(config.lane_capacity, 256);
    assert_eq!(config.max_conversations, 100_000);
    assert_eq!(config.conversation_ttl_ms, 86_400_000);
    assert_eq!(config.default_conversation_scope, ConfigScope::PerChannelPeer);
}

#[test]
fn partition_changes_buckets_correctly() {
    let mut a = GatewayConfig::default();
    let mut b = GatewayConfig::default();
    b.port = 9999;
    b.lane_capacity = 512;

    let (hot, restart) = a.partition_changes(&b);
    assert_eq!(hot, vec!["lane_capacity"]);
    assert_eq!(restart, vec!["port"]);

    a.port = 9999;
    a.lane_capacity = 512;
    assert!(a.changed_fields(&b).is_empty());
}
