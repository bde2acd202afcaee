//! In-memory event log tests
//!
//! Covers the streaming contract the client relies on:
//! - Bulk snapshot first on every subscription
//! - Single, multi and nested frames for later writes
//! - Ancestor writes/deletes arriving as a fresh bulk frame
//! - Injected failures, latency and dropped subscriptions

use cheer_core::StreamFrame;
use cheer_transport::{EventLog, LogEvent, LogOp, LogReceiver, MemoryEventLog};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::timeout;

// ============================================================================
// Utilities
// ============================================================================

async fn next_frame(rx: &mut LogReceiver) -> StreamFrame {
    match timeout(Duration::from_secs(1), rx.recv()).await {
        Ok(Some(LogEvent::Frame(frame))) => frame,
        other => panic!("expected a frame, got {:?}", other),
    }
}

async fn assert_quiet(rx: &mut LogReceiver) {
    assert!(
        timeout(Duration::from_millis(50), rx.recv()).await.is_err(),
        "unexpected event"
    );
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_subscribe_starts_with_bulk_snapshot() {
    let log = MemoryEventLog::new();
    log.write("rooms/abc/reactions/old", json!({"emoji": "👏", "timestamp": 1}))
        .await
        .unwrap();

    let mut rx = log.subscribe("rooms/abc/reactions").await.unwrap();
    assert_eq!(
        next_frame(&mut rx).await,
        StreamFrame::Bulk(json!({"old": {"emoji": "👏", "timestamp": 1}}))
    );

    let mut empty = log.subscribe("rooms/abc/pace").await.unwrap();
    assert_eq!(next_frame(&mut empty).await, StreamFrame::Bulk(Value::Null));
}

#[tokio::test]
async fn test_child_write_is_single_frame() {
    let log = MemoryEventLog::new();
    let mut rx = log.subscribe("rooms/abc/reactions").await.unwrap();
    next_frame(&mut rx).await;

    let key = log
        .push("rooms/abc/reactions", json!({"emoji": "🔥", "timestamp": 5}))
        .await
        .unwrap();

    assert_eq!(
        next_frame(&mut rx).await,
        StreamFrame::Single {
            key,
            value: json!({"emoji": "🔥", "timestamp": 5})
        }
    );
}

#[tokio::test]
async fn test_update_is_multi_frame() {
    let log = MemoryEventLog::new();
    let mut rx = log.subscribe("rooms/abc/pace").await.unwrap();
    next_frame(&mut rx).await;

    let mut values = Map::new();
    values.insert("a".to_string(), json!({"level": "slow", "timestamp": 1}));
    values.insert("b".to_string(), json!({"level": "good", "timestamp": 2}));
    log.update("rooms/abc/pace", values).await.unwrap();

    match next_frame(&mut rx).await {
        StreamFrame::Multi(items) => assert_eq!(items.len(), 2),
        other => panic!("expected multi frame, got {:?}", other),
    }
    assert_eq!(log.value("rooms/abc/pace/b/level"), json!("good"));
}

#[tokio::test]
async fn test_field_write_is_nested_frame() {
    let log = MemoryEventLog::new();
    log.write("rooms/abc/questions/q1", json!({"text": "why?", "timestamp": 1}))
        .await
        .unwrap();

    let mut rx = log.subscribe("rooms/abc/questions").await.unwrap();
    next_frame(&mut rx).await;

    log.write("rooms/abc/questions/q1/answered", json!(true))
        .await
        .unwrap();

    assert_eq!(
        next_frame(&mut rx).await,
        StreamFrame::Nested {
            key: "q1".to_string(),
            path: "answered".to_string(),
            value: json!(true)
        }
    );
}

#[tokio::test]
async fn test_ancestor_delete_resends_bulk() {
    let log = MemoryEventLog::new();
    log.write("rooms/abc/host", json!({"hostActive": true, "createdAt": 1}))
        .await
        .unwrap();

    let mut rx = log.subscribe("rooms/abc/reactions").await.unwrap();
    next_frame(&mut rx).await;

    log.delete("rooms/abc").await.unwrap();
    assert_eq!(next_frame(&mut rx).await, StreamFrame::Bulk(Value::Null));
    assert_eq!(log.value("rooms"), Value::Null);
    assert_eq!(log.count(&LogOp::Delete("rooms/abc".to_string())), 1);
}

#[tokio::test]
async fn test_unrelated_writes_are_not_streamed() {
    let log = MemoryEventLog::new();
    let mut rx = log.subscribe("rooms/abc/reactions").await.unwrap();
    next_frame(&mut rx).await;

    log.write("rooms/other/reactions/x", json!({"emoji": "🎉", "timestamp": 1}))
        .await
        .unwrap();
    log.write("rooms/abc/pace/x", json!({"level": "fast", "timestamp": 1}))
        .await
        .unwrap();

    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn test_injected_failures() {
    let log = MemoryEventLog::new();

    log.set_write_failure(Some("offline"));
    assert!(log.write("rooms/abc/host", json!(true)).await.is_err());
    assert!(log.history().is_empty());

    log.set_write_failure(None);
    log.write("rooms/abc/host", json!(true)).await.unwrap();

    log.set_delete_failure(Some("offline"));
    assert!(log.delete("rooms/abc").await.is_err());
    assert_eq!(log.value("rooms/abc/host"), json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_write_delay_holds_value_back() {
    let log = MemoryEventLog::new();
    log.set_write_delay(Some(Duration::from_secs(3)));

    let writer = {
        let log = log.clone();
        tokio::spawn(async move { log.write("rooms/abc/host", json!(true)).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(log.value("rooms/abc/host"), Value::Null);

    writer.await.unwrap().unwrap();
    assert_eq!(log.value("rooms/abc/host"), json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_delay_holds_subscription_back() {
    let log = MemoryEventLog::new();
    log.set_subscribe_delay(Some(Duration::from_secs(2)));

    let subscriber = {
        let log = log.clone();
        tokio::spawn(async move { log.subscribe("rooms/abc/reactions").await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(log.subscriber_count(), 0);

    let _rx = subscriber.await.unwrap().unwrap();
    assert_eq!(log.subscriber_count(), 1);
}

#[tokio::test]
async fn test_drop_subscriptions_reports_disconnect() {
    let log = MemoryEventLog::new();
    let mut rx = log.subscribe("rooms/abc/reactions").await.unwrap();
    next_frame(&mut rx).await;
    assert_eq!(log.subscriber_count(), 1);

    log.drop_subscriptions("network down");

    assert_eq!(rx.recv().await, Some(LogEvent::Error("network down".to_string())));
    assert_eq!(
        rx.recv().await,
        Some(LogEvent::Disconnected {
            reason: Some("network down".to_string())
        })
    );
    assert_eq!(rx.recv().await, None);
    assert_eq!(log.subscriber_count(), 0);
}

#[tokio::test]
async fn test_dropped_receiver_is_pruned() {
    let log = MemoryEventLog::new();
    let rx = log.subscribe("rooms/abc/reactions").await.unwrap();
    assert_eq!(log.subscriber_count(), 1);

    drop(rx);
    assert_eq!(log.subscriber_count(), 0);
}
