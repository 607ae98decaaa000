// Wire-contract tests for the NATS message types
//
// Capture bridges are written in other languages; these tests pin the JSON
// field names and enum spellings they must produce, independent of how the
// Rust types happen to be declared.

use meeting_recorder::nats::{FrameMessage, TransportEventMessage};
use meeting_recorder::session::TransportEvent;
use meeting_recorder::{Notice, NoticeSeverity, ParticipantId};

#[test]
fn test_frame_message_accepts_producer_json() {
    // "AAAAAQ==" is s16le for the samples [0, 256].
    let json = r#"{
        "meeting_id": "standup",
        "participant": 42,
        "label": "alice",
        "pcm": "AAAAAQ==",
        "sample_rate": 48000,
        "channels": 2,
        "timestamp": "2026-08-22T10:00:00Z"
    }"#;

    let message: FrameMessage = serde_json::from_str(json).unwrap();
    assert_eq!(message.meeting_id, "standup");

    let frame = message.into_frame().unwrap();
    assert_eq!(frame.participant, ParticipantId(42));
    assert_eq!(frame.label.as_deref(), Some("alice"));
    assert_eq!(frame.pcm, vec![0, 0, 0, 1]);
    assert_eq!(frame.sample_rate, 48000);
    assert_eq!(frame.channels, 2);
}

#[test]
fn test_frame_message_label_is_optional() {
    let json = r#"{
        "meeting_id": "standup",
        "participant": 42,
        "pcm": "",
        "sample_rate": 48000,
        "channels": 2,
        "timestamp": "2026-08-22T10:00:00Z"
    }"#;

    let message: FrameMessage = serde_json::from_str(json).unwrap();
    assert!(message.label.is_none());
    assert!(message.into_frame().unwrap().pcm.is_empty());
}

#[test]
fn test_frame_message_wire_field_names() {
    let json = r#"{
        "meeting_id": "m",
        "participant": 1,
        "label": null,
        "pcm": "AAA=",
        "sample_rate": 16000,
        "channels": 1,
        "timestamp": "2026-08-22T10:00:00Z"
    }"#;
    let message: FrameMessage = serde_json::from_str(json).unwrap();

    let out = serde_json::to_value(&message).unwrap();
    for key in [
        "meeting_id",
        "participant",
        "label",
        "pcm",
        "sample_rate",
        "channels",
        "timestamp",
    ] {
        assert!(out.get(key).is_some(), "missing wire field {}", key);
    }
}

#[test]
fn test_transport_events_are_spelled_snake_case() {
    for (event, wire) in [
        (TransportEvent::Connected, "connected"),
        (TransportEvent::Disconnected, "disconnected"),
        (TransportEvent::Reconnected, "reconnected"),
    ] {
        let json = format!(
            r#"{{"meeting_id":"m","event":"{}","timestamp":"2026-08-22T10:00:00Z"}}"#,
            wire
        );
        let message: TransportEventMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(message.event, event);
    }
}

#[test]
fn test_notice_wire_shape() {
    let notice = Notice::error("standup", "recording is lost");
    let json = serde_json::to_value(&notice).unwrap();

    assert_eq!(json["meeting_id"], "standup");
    assert_eq!(json["severity"], "error");
    assert_eq!(json["message"], "recording is lost");
    assert!(json["timestamp"].is_string());

    let parsed: Notice = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.severity, NoticeSeverity::Error);
}
