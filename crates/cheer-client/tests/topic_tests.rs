//! Stream topic tests
//!
//! Covers:
//! - Backlog suppression and live single items
//! - Multi-item updates
//! - Malformed items and nested field updates
//! - Stop and transport loss

use cheer_client::{StreamTopic, TopicSignal};
use cheer_core::{PaceLevel, TopicEvent, TopicKind};
use cheer_test_utils::{Collector, RoomFixture};
use cheer_transport::EventLog;
use serde_json::{json, Map};
use std::time::Duration;

// ============================================================================
// Utilities
// ============================================================================

const WAIT: Duration = Duration::from_secs(2);

async fn open(fixture: &RoomFixture, kind: TopicKind) -> (StreamTopic, Collector<TopicSignal>) {
    let collector = Collector::new();
    let callback = collector.callback();
    let path = format!("rooms/abc12/{}", kind.segment());
    let topic = StreamTopic::open(&fixture.log, &path, kind, move |signal| callback(&signal))
        .await
        .unwrap();
    (topic, collector)
}

fn items(collector: &Collector<TopicSignal>) -> Vec<(String, TopicEvent)> {
    collector
        .values()
        .into_iter()
        .filter_map(|signal| match signal {
            TopicSignal::Item(item) => Some((item.key, item.event)),
            TopicSignal::Lost { .. } => None,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_backlog_is_suppressed() {
    let fixture = RoomFixture::new(1000);
    fixture.push_reaction("abc12", "👏", 500).await;
    fixture.push_reaction("abc12", "👏", 600).await;

    let (topic, collector) = open(&fixture, TopicKind::Reactions).await;
    let key = fixture.push_reaction("abc12", "🔥", 1500).await;

    assert!(collector.wait_for_count(1, WAIT).await);
    let received = items(&collector);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, key);
    assert!(topic.is_live());
}

#[tokio::test]
async fn test_multi_update_dispatches_each_item() {
    let fixture = RoomFixture::new(1000);
    let (_topic, collector) = open(&fixture, TopicKind::Pace).await;

    let mut votes = Map::new();
    votes.insert("a".to_string(), json!({"level": "slow", "timestamp": 1100}));
    votes.insert("b".to_string(), json!({"level": "FAST", "timestamp": 1200}));
    fixture.log.update("rooms/abc12/pace", votes).await.unwrap();

    assert!(collector.wait_for_count(2, WAIT).await);
    let levels: Vec<_> = items(&collector)
        .into_iter()
        .filter_map(|(_, event)| match event {
            TopicEvent::Pace(vote) => Some(vote.level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![PaceLevel::Slow, PaceLevel::Fast]);
}

#[tokio::test]
async fn test_malformed_items_are_dropped() {
    let fixture = RoomFixture::new(1000);
    let (_topic, collector) = open(&fixture, TopicKind::Reactions).await;

    fixture
        .put_raw("abc12", TopicKind::Reactions, "bad1", json!({"emoji": "", "timestamp": 1}))
        .await;
    fixture
        .put_raw("abc12", TopicKind::Reactions, "bad2", json!({"emoji": "🔥"}))
        .await;
    fixture
        .put_raw("abc12", TopicKind::Reactions, "bad3", json!("🔥"))
        .await;
    fixture.push_reaction("abc12", "🎉", 2000).await;

    assert!(collector.wait_for_count(1, WAIT).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(collector.count(), 1);
}

#[tokio::test]
async fn test_answered_field_update_is_not_an_item() {
    let fixture = RoomFixture::new(1000);
    let (_topic, collector) = open(&fixture, TopicKind::Questions).await;

    fixture.put_question("abc12", "q1", "why?", 1500).await;
    assert!(collector.wait_for_count(1, WAIT).await);

    fixture
        .log
        .write("rooms/abc12/questions/q1/answered", json!(true))
        .await
        .unwrap();
    fixture.put_question("abc12", "q2", "how?", 1600).await;

    assert!(collector.wait_for_count(2, WAIT).await);
    let ids: Vec<_> = items(&collector).into_iter().map(|(key, _)| key).collect();
    assert_eq!(ids, vec!["q1", "q2"]);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let fixture = RoomFixture::new(1000);
    let (topic, collector) = open(&fixture, TopicKind::Reactions).await;
    assert!(fixture.wait_for_subscribers(1).await);

    topic.stop();
    topic.stop();
    assert!(!topic.is_running());
    assert!(!topic.is_live());

    fixture.push_reaction("abc12", "🔥", 1500).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(collector.count(), 0);
    assert_eq!(fixture.log.subscriber_count(), 0);
}

#[tokio::test]
async fn test_transport_loss_is_signalled() {
    let fixture = RoomFixture::new(1000);
    let (topic, collector) = open(&fixture, TopicKind::Reactions).await;

    fixture.log.drop_subscriptions("network down");

    assert!(collector.wait_for_count(1, WAIT).await);
    assert_eq!(
        collector.last(),
        Some(TopicSignal::Lost {
            reason: Some("network down".to_string())
        })
    );
    assert!(!topic.is_live());
}
