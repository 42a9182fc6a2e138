// SPDX-License-Identifier: BUSL-1.1

use super::*;

fn base_input() -> ResolveInput<'static> {
    ResolveInput {
        scope: ConversationScope::Main,
        agent_id: "agent-1",
        channel_id: "chan-1",
        peer_id: None,
        account_id: None,
        group_id: None,
        message_type: None,
    }
}

#[test]
fn main_scope_keys_by_agent_only() {
    let res = resolve(base_input()).unwrap();
    assert_eq!(res.key.as_str(), "agent:agent-1:main");
    assert!(!res.degraded);
    assert!(res.warnings.is_empty());
}

#[test]
fn per_peer_requires_peer_id() {
    let mut input = base_input();
    input.scope = ConversationScope::PerPeer;
    assert!(matches!(resolve(input), Err(GatewayError::InvalidArgument)));

    let mut input = base_input();
    input.scope = ConversationScope::PerPeer;
    input.peer_id = Some("peer-1");
    let res = resolve(input).unwrap();
    assert_eq!(res.key.as_str(), "agent:agent-1:dm:peer-1");
}

#[test]
fn per_channel_peer_keys_include_channel() {
    let mut input = base_input();
    input.scope = ConversationScope::PerChannelPeer;
    input.peer_id = Some("peer-1");
    let res = resolve(input).unwrap();
    assert_eq!(res.key.as_str(), "agent:agent-1:chan-1:dm:peer-1");
    assert!(!res.degraded);
}

/// Per-account-channel-peer without accountId degrades to
/// per-channel-peer, with a warning naming both scopes.
#[test]
fn missing_account_id_degrades_with_warning() {
    let mut input = base_input();
    input.scope = ConversationScope::PerAccountChannelPeer;
    input.peer_id = Some("peer-1");
    input.account_id = None;

    let res = resolve(input).unwrap();
    assert_eq!(res.key.as_str(), "agent:agent-1:chan-1:dm:peer-1");
    assert!(res.degraded);
    assert_eq!(res.requested_scope, ConversationScope::PerAccountChannelPeer);
    assert!(matches!(res.effective_scope, EffectiveScope::PerChannelPeer));
    assert_eq!(res.warnings.len(), 1);
    assert!(res.warnings[0].contains("per-account-channel-peer"));
    assert!(res.warnings[0].contains("per-channel-peer"));
}

#[test]
fn per_account_channel_peer_with_account_id_is_not_degraded() {
    let mut input = base_input();
    input.scope = ConversationScope::PerAccountChannelPeer;
    input.peer_id = Some("peer-1");
    input.account_id = Some("acct-1");

    let res = resolve(input).unwrap();
    assert_eq!(res.key.as_str(), "agent:agent-1:chan-1:acct-1:dm:peer-1");
    assert!(!res.degraded);
    assert!(res.warnings.is_empty());
}

/// A group message dominates any requested scope, including `main`.
#[test]
fn group_message_dominates_requested_scope() {
    let mut input = base_input();
    input.scope = ConversationScope::Main;
    input.message_type = Some(MessageType::Group);
    input.group_id = Some("group-1");

    let res = resolve(input).unwrap();
    assert_eq!(res.key.as_str(), "agent:agent-1:chan-1:group:group-1");
    assert_eq!(res.requested_scope, ConversationScope::Main);
    assert!(matches!(res.effective_scope, EffectiveScope::Group));
    assert!(!res.degraded);
}

#[test]
fn group_message_without_group_id_is_invalid() {
    let mut input = base_input();
    input.message_type = Some(MessageType::Group);
    input.group_id = None;
    assert!(matches!(resolve(input), Err(GatewayError::InvalidArgument)));
}

#[test]
fn colon_in_any_id_is_rejected() {
    let mut input = base_input();
    input.agent_id = "bad:agent";
    assert!(matches!(resolve(input), Err(GatewayError::InvalidArgument)));

    let mut input = base_input();
    input.scope = ConversationScope::PerPeer;
    input.peer_id = Some("bad:peer");
    assert!(matches!(resolve(input), Err(GatewayError::InvalidArgument)));
}

#[test]
fn parse_round_trips_each_key_shape() {
    let cases: Vec<(ResolveInput, EffectiveScope)> = vec![
        (base_input(), EffectiveScope::Main),
        (
            ResolveInput { scope: ConversationScope::PerPeer, peer_id: Some("p1"), ..base_input() },
            EffectiveScope::PerPeer,
        ),
        (
            ResolveInput {
                scope: ConversationScope::PerChannelPeer,
                peer_id: Some("p1"),
                ..base_input()
            },
            EffectiveScope::PerChannelPeer,
        ),
        (
            ResolveInput {
                scope: ConversationScope::PerAccountChannelPeer,
                peer_id: Some("p1"),
                account_id: Some("a1"),
                ..base_input()
            },
            EffectiveScope::PerAccountChannelPeer,
        ),
        (
            ResolveInput {
                message_type: Some(MessageType::Group),
                group_id: Some("g1"),
                ..base_input()
            },
            EffectiveScope::Group,
        ),
    ];

    for (input, expected_scope) in cases {
        let res = resolve(input).unwrap();
        let parsed = parse(res.key.as_str()).expect("key should parse");
        assert_eq!(parsed.scope, expected_scope);
        assert_eq!(parsed.agent_id, "agent-1");
    }
}

#[test]
fn parse_rejects_unknown_shape() {
    assert!(parse("not:a:real:key:at:all:here").is_none());
    assert!(parse("").is_none());
}
