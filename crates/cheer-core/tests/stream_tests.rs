//! Stream decoding tests
//!
//! Feeds realistic event-stream transcripts through the SSE decoder, the
//! frame classifier and the topic event decoder.

use cheer_core::codec::decode_event;
use cheer_core::{PaceLevel, SseDecoder, StreamFrame, StreamMessage, TopicEvent, TopicKind};
use serde_json::json;

fn messages(transcript: &str) -> Vec<StreamMessage> {
    let mut decoder = SseDecoder::new();
    decoder
        .feed(transcript.as_bytes())
        .iter()
        .map(|e| decode_event(e).expect("decodable event"))
        .collect()
}

#[test]
fn test_backlog_then_incremental_reactions() {
    let transcript = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"old1\":{\"emoji\":\"👏\",\"timestamp\":10}}}\n\n",
        "event: keep-alive\n",
        "data: null\n\n",
        "event: put\n",
        "data: {\"path\":\"/new1\",\"data\":{\"emoji\":\"🔥\",\"timestamp\":1500}}\n\n",
    );

    let msgs = messages(transcript);
    assert_eq!(msgs.len(), 3);

    match &msgs[0] {
        StreamMessage::Frame(frame) => assert!(frame.is_bulk()),
        other => panic!("expected bulk frame, got {:?}", other),
    }
    assert_eq!(msgs[1], StreamMessage::KeepAlive);

    match &msgs[2] {
        StreamMessage::Frame(StreamFrame::Single { key, value }) => {
            assert_eq!(key, "new1");
            let event = TopicEvent::decode(TopicKind::Reactions, key, value).unwrap();
            assert_eq!(event.timestamp(), 1500);
        }
        other => panic!("expected single frame, got {:?}", other),
    }
}

#[test]
fn test_patch_carries_several_pace_votes() {
    let transcript = concat!(
        "event: patch\n",
        "data: {\"path\":\"/\",\"data\":{",
        "\"a\":{\"level\":\"slow\",\"timestamp\":1},",
        "\"b\":{\"level\":\"fast\",\"timestamp\":2}}}\n\n",
    );

    let msgs = messages(transcript);
    let items = match &msgs[0] {
        StreamMessage::Frame(StreamFrame::Multi(items)) => items.clone(),
        other => panic!("expected multi frame, got {:?}", other),
    };

    let levels: Vec<PaceLevel> = items
        .iter()
        .map(|(key, value)| match TopicEvent::decode(TopicKind::Pace, key, value) {
            Ok(TopicEvent::Pace(vote)) => vote.level,
            other => panic!("expected pace vote, got {:?}", other),
        })
        .collect();

    assert_eq!(levels, vec![PaceLevel::Slow, PaceLevel::Fast]);
}

#[test]
fn test_answered_flag_arrives_as_nested_frame() {
    let msgs = messages("event: put\ndata: {\"path\":\"/q1/answered\",\"data\":true}\n\n");
    assert_eq!(
        msgs[0],
        StreamMessage::Frame(StreamFrame::Nested {
            key: "q1".to_string(),
            path: "answered".to_string(),
            value: json!(true),
        })
    );
}

#[test]
fn test_auth_revoked() {
    let msgs = messages("event: auth_revoked\ndata: credential is no longer valid\n\n");
    assert_eq!(msgs, vec![StreamMessage::AuthRevoked]);
}
