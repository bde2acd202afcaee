//! Common test helpers for Cheer tests
//!
//! This crate provides:
//! - Condition-based waiting (no hardcoded sleeps)
//! - A room fixture over the in-memory event log with a manual clock
//! - Recording surfaces and a factory that hands them out
//! - Collectors for observer callbacks

use cheer_client::RoomConnection;
use cheer_core::{ManualClock, PaceLevel, RoomCode, Timestamp, TopicKind};
use cheer_display::{DisplayError, DisplayInfo, Surface, SurfaceFactory};
use cheer_transport::{EventLog, MemoryEventLog};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{timeout, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Wait for a condition with timeout - condition-based, not time-based
pub async fn wait_for<F, Fut>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    check().await
}

/// Wait for an atomic counter to reach a target value
pub async fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || async { counter.load(Ordering::SeqCst) >= target },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Wait for a boolean flag to become true
pub async fn wait_for_flag(flag: &AtomicBool, max_wait: Duration) -> bool {
    wait_for(
        || async { flag.load(Ordering::SeqCst) },
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
    .await
}

/// Wait with notification - more efficient than polling
pub async fn wait_with_notify(notify: &Notify, max_wait: Duration) -> bool {
    timeout(max_wait, notify.notified()).await.is_ok()
}

// ============================================================================
// Room Fixture
// ============================================================================

/// An in-memory event log plus a manual clock, with helpers for producing
/// room items the way audience clients would
#[derive(Clone)]
pub struct RoomFixture {
    pub log: MemoryEventLog,
    pub clock: ManualClock,
}

impl RoomFixture {
    /// Fixture whose clock starts at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            log: MemoryEventLog::new(),
            clock: ManualClock::new(now),
        }
    }

    pub fn event_log(&self) -> Arc<dyn EventLog> {
        Arc::new(self.log.clone())
    }

    /// Connection over this fixture's log and clock
    pub fn connection(&self) -> RoomConnection {
        RoomConnection::builder(self.event_log())
            .clock(self.clock.clone())
            .build()
    }

    /// Connection with a custom registration timeout
    pub fn connection_with_timeout(&self, connect_timeout: Duration) -> RoomConnection {
        RoomConnection::builder(self.event_log())
            .clock(self.clock.clone())
            .timeout(connect_timeout)
            .build()
    }

    fn code(room: &str) -> RoomCode {
        RoomCode::parse(room).unwrap()
    }

    /// Push a reaction with an explicit timestamp; returns its key
    pub async fn push_reaction(&self, room: &str, emoji: &str, timestamp: Timestamp) -> String {
        self.log
            .push(
                &Self::code(room).topic_path(TopicKind::Reactions),
                json!({"emoji": emoji, "timestamp": timestamp}),
            )
            .await
            .unwrap()
    }

    /// Push a pace vote with an explicit timestamp; returns its key
    pub async fn push_pace(&self, room: &str, level: PaceLevel, timestamp: Timestamp) -> String {
        self.log
            .push(
                &Self::code(room).topic_path(TopicKind::Pace),
                json!({"level": level.as_str(), "timestamp": timestamp}),
            )
            .await
            .unwrap()
    }

    /// Write a question under a chosen id
    pub async fn put_question(&self, room: &str, id: &str, text: &str, timestamp: Timestamp) {
        self.log
            .write(
                &Self::code(room).question_path(id),
                json!({"text": text, "answered": false, "timestamp": timestamp}),
            )
            .await
            .unwrap();
    }

    /// Write an arbitrary item payload under `topic`
    pub async fn put_raw(&self, room: &str, topic: TopicKind, key: &str, value: Value) {
        let path = format!("{}/{}", Self::code(room).topic_path(topic), key);
        self.log.write(&path, value).await.unwrap();
    }

    /// Current presence entry (`null` when absent)
    pub fn presence(&self, room: &str) -> Value {
        self.log.value(&Self::code(room).host_path())
    }

    /// True if anything is stored under the room
    pub fn room_exists(&self, room: &str) -> bool {
        !self.log.value(&Self::code(room).path()).is_null()
    }

    /// Wait until at least `count` subscriptions are open on the log
    pub async fn wait_for_subscribers(&self, count: usize) -> bool {
        wait_for(
            || async { self.log.subscriber_count() >= count },
            DEFAULT_CHECK_INTERVAL,
            DEFAULT_TIMEOUT,
        )
        .await
    }
}

// ============================================================================
// Recording Surfaces
// ============================================================================

/// Surface that records what it was asked to do
#[derive(Default)]
pub struct RecordingSurface {
    id: String,
    spawned: Mutex<Vec<String>>,
    click_through: Mutex<Vec<bool>>,
    closed: AtomicBool,
    count: AtomicU32,
}

impl RecordingSurface {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Symbols spawned, in order
    pub fn spawned(&self) -> Vec<String> {
        self.spawned.lock().clone()
    }

    pub fn spawn_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Every click-through value applied, in order
    pub fn click_through_history(&self) -> Vec<bool> {
        self.click_through.lock().clone()
    }

    pub async fn wait_for_spawns(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }
}

impl Surface for RecordingSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn spawn(&self, symbol: &str) -> Result<(), DisplayError> {
        if self.is_closed() {
            return Err(DisplayError::SurfaceClosed(self.id.clone()));
        }
        self.spawned.lock().push(symbol.to_string());
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_click_through(&self, enabled: bool) -> Result<(), DisplayError> {
        if self.is_closed() {
            return Err(DisplayError::SurfaceClosed(self.id.clone()));
        }
        self.click_through.lock().push(enabled);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Factory handing out [`RecordingSurface`]s and keeping every one it made
#[derive(Clone, Default)]
pub struct RecordingFactory {
    created: Arc<Mutex<Vec<Arc<RecordingSurface>>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every surface created so far, oldest first
    pub fn created(&self) -> Vec<Arc<RecordingSurface>> {
        self.created.lock().clone()
    }

    /// Most recent surface for `display_id`
    pub fn latest(&self, display_id: &str) -> Option<Arc<RecordingSurface>> {
        self.created
            .lock()
            .iter()
            .rev()
            .find(|s| s.id() == display_id)
            .cloned()
    }

    /// Surfaces that have not been closed
    pub fn open(&self) -> Vec<Arc<RecordingSurface>> {
        self.created
            .lock()
            .iter()
            .filter(|s| !s.is_closed())
            .cloned()
            .collect()
    }
}

impl SurfaceFactory for RecordingFactory {
    fn create(&self, display: &DisplayInfo) -> Result<Arc<dyn Surface>, DisplayError> {
        let surface = Arc::new(RecordingSurface::new(&display.id));
        self.created.lock().push(surface.clone());
        Ok(surface)
    }
}

// ============================================================================
// Collectors
// ============================================================================

/// Collects values handed to an observer callback
pub struct Collector<T> {
    values: Arc<Mutex<Vec<T>>>,
    notify: Arc<Notify>,
    count: Arc<AtomicU32>,
}

impl<T: Clone + Send + 'static> Collector<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Callback to register with an observer hub
    pub fn callback(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let values = self.values.clone();
        let notify = self.notify.clone();
        let count = self.count.clone();

        move |value| {
            values.lock().push(value.clone());
            count.fetch_add(1, Ordering::SeqCst);
            notify.notify_waiters();
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait for at least n values to be received
    pub async fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait).await
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<T: Clone + Send + 'static> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Collector<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            notify: self.notify.clone(),
            count: self.count.clone(),
        }
    }
}
