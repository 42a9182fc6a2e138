// SPDX-License-Identifier: BUSL-1.1

use bytes::Bytes;
use edge_gateway_core::Lane;

use super::*;

#[test]
fn dispatch_frame_round_trips() {
    let message = LaneMessage::new("m1", Lane::Steer, "chan-1", 1234, Bytes::from_static(b"hello"));
    let frame = Frame::Dispatch { message };
    let encoded = frame.encode().unwrap();
    assert!(!encoded.contains('\n'));

    let decoded = Frame::decode(&encoded).unwrap();
    match decoded {
        Frame::Dispatch { message } => assert_eq!(message.id, "m1"),
        other => panic!("expected Dispatch, got {other:?}"),
    }
}

#[test]
fn ack_frame_round_trips() {
    let frame = Frame::Ack { message_id: "m1".to_string() };
    let encoded = frame.encode().unwrap();
    let decoded = Frame::decode(&encoded).unwrap();
    assert!(matches!(decoded, Frame::Ack { message_id } if message_id == "m1"));
}

#[test]
fn ping_pong_are_tagged_only() {
    let encoded = Frame::Ping.encode().unwrap();
    assert_eq!(encoded, r#"{"type":"ping"}"#);
    assert!(matches!(Frame::decode(&encoded).unwrap(), Frame::Ping));
}

#[test]
fn session_event_round_trips() {
    let frame = Frame::SessionEvent { event: SessionEventKind::Suspend };
    let encoded = frame.encode().unwrap();
    let decoded = Frame::decode(&encoded).unwrap();
    assert!(matches!(decoded, Frame::SessionEvent { event: SessionEventKind::Suspend }));
}

#[test]
fn inbound_frame_round_trips() {
    let frame = Frame::Inbound {
        message_id: "m1".to_string(),
        channel_id: "chan-1".to_string(),
        payload: serde_json::json!({"text": "hi"}),
    };
    let encoded = frame.encode().unwrap();
    let decoded = Frame::decode(&encoded).unwrap();
    match decoded {
        Frame::Inbound { message_id, channel_id, payload } => {
            assert_eq!(message_id, "m1");
            assert_eq!(channel_id, "chan-1");
            assert_eq!(payload["text"], "hi");
        }
        other => panic!("expected Inbound, got {other:?}"),
    }
}

#[test]
fn malformed_line_fails_to_decode() {
    assert!(Frame::decode("not json").is_err());
}
