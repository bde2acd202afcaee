//! Room connection lifecycle
//!
//! ```text
//! Idle -> Connecting -> Connected -> (leave) -> Idle
//!                    -> Cancelled | Failed | TimedOut
//! ```
//!
//! Connecting registers host presence (write, then read back), races that
//! against the connect timeout, and only then opens the topic streams. Items
//! created before the connect started are dropped at the cutoff.

use cheer_core::{Clock, HostPresence, Room, RoomCode, Timestamp, TopicKind};
use cheer_transport::EventLog;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::builder::RoomConnectionBuilder;
use crate::error::{ClientError, Result};
use crate::observer::{Observers, SubscriptionHandle};
use crate::router::ReactionRouter;
use crate::topic::{StreamTopic, TopicItem, TopicSignal};

/// Where a connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Cancelled,
    Failed,
    TimedOut,
}

impl ConnectionState {
    /// States a new `connect` may start from
    pub fn can_connect(&self) -> bool {
        !matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// Connection status notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    StateChanged(ConnectionState),
    /// A topic stream ended while connected; it is not reopened
    TransportLost {
        topic: TopicKind,
        reason: Option<String>,
    },
}

/// Whether topic items may reach the router
enum Gate {
    Closed,
    /// Streams are opening; live items wait for the connect to settle
    Holding(Vec<TopicItem>),
    Open,
}

pub(crate) struct ConnectionConfig {
    pub log: Arc<dyn EventLog>,
    pub clock: Arc<dyn Clock>,
    pub timeout: Duration,
    pub topics: Vec<TopicKind>,
}

struct Inner {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    topics: Vec<TopicKind>,
    router: Arc<ReactionRouter>,

    state: RwLock<ConnectionState>,
    room: RwLock<Option<Room>>,
    /// Room the latest attempt targets
    target: RwLock<Option<RoomCode>>,
    cutoff: RwLock<Option<Timestamp>>,

    cancel_requested: AtomicBool,
    /// Bumped on every connect attempt
    generation: AtomicU64,
    gate: Arc<Mutex<Gate>>,

    streams: Mutex<Vec<StreamTopic>>,
    status: Observers<ConnectionStatus>,
}

/// A presenter's connection to one room
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct RoomConnection {
    inner: Arc<Inner>,
}

impl RoomConnection {
    /// Connection with the default clock, timeout and topics
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        RoomConnectionBuilder::new(log).build()
    }

    pub fn builder(log: Arc<dyn EventLog>) -> RoomConnectionBuilder {
        RoomConnectionBuilder::new(log)
    }

    pub(crate) fn from_config(config: ConnectionConfig) -> Self {
        let router = Arc::new(ReactionRouter::new(config.log.clone()));
        Self {
            inner: Arc::new(Inner {
                log: config.log,
                clock: config.clock,
                timeout: config.timeout,
                topics: config.topics,
                router,
                state: RwLock::new(ConnectionState::Idle),
                room: RwLock::new(None),
                target: RwLock::new(None),
                cutoff: RwLock::new(None),
                cancel_requested: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                gate: Arc::new(Mutex::new(Gate::Closed)),
                streams: Mutex::new(Vec::new()),
                status: Observers::new(),
            }),
        }
    }

    /// Host `raw_code` and start streaming its topics
    pub async fn connect(&self, raw_code: &str) -> Result<Room> {
        let code = RoomCode::parse(raw_code)?;
        let inner = &self.inner;

        let generation = {
            let mut state = inner.state.write();
            if !state.can_connect() {
                return Err(ClientError::AlreadyConnected);
            }
            inner.cancel_requested.store(false, Ordering::SeqCst);
            *inner.target.write() = Some(code.clone());
            *state = ConnectionState::Connecting;
            inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        inner.status.emit(&ConnectionStatus::StateChanged(ConnectionState::Connecting));

        let cutoff = inner.clock.now();
        *inner.cutoff.write() = Some(cutoff);
        inner.router.reset();

        let room = Room::new(code.clone(), cutoff);
        info!("Connecting to room {} (cutoff {})", code, cutoff);

        let mut registration = tokio::spawn(register(inner.log.clone(), room.clone()));

        let outcome = match tokio::time::timeout(inner.timeout, &mut registration).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ClientError::ConnectionFailed(e.to_string())),
            Err(_) => {
                warn!("Registration for {} timed out after {:?}", code, inner.timeout);
                self.set_state(ConnectionState::TimedOut);
                remove_presence(inner.log.as_ref(), &code).await;
                self.spawn_late_cleanup(registration, code, generation);
                return Err(ClientError::Timeout(inner.timeout));
            }
        };

        if self.cancel_requested() {
            self.unwind(&code, ConnectionState::Cancelled).await;
            return Err(ClientError::Cancelled);
        }

        if let Err(e) = outcome {
            warn!("Registration for {} failed: {}", code, e);
            let reason = match e {
                ClientError::ConnectionFailed(reason) => reason,
                other => other.to_string(),
            };
            self.unwind(&code, ConnectionState::Failed).await;
            return Err(ClientError::ConnectionFailed(reason));
        }

        *inner.gate.lock() = Gate::Holding(Vec::new());
        let mut streams = Vec::with_capacity(inner.topics.len());
        for kind in &inner.topics {
            let path = code.topic_path(*kind);
            let sink = self.topic_sink(*kind, cutoff);
            match StreamTopic::open(inner.log.as_ref(), &path, *kind, sink).await {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    warn!("Failed to open {} for {}: {}", kind, code, e);
                    streams.iter().for_each(StreamTopic::stop);
                    self.unwind(&code, ConnectionState::Failed).await;
                    return Err(ClientError::ConnectionFailed(e.to_string()));
                }
            }
        }

        if !self.settle(&room, streams) {
            self.unwind(&code, ConnectionState::Cancelled).await;
            return Err(ClientError::Cancelled);
        }

        info!("Connected to room {}", code);
        Ok(room)
    }

    /// Move to `Connected` unless a cancel got in first
    ///
    /// Items held while the streams opened are dispatched before any later
    /// ones. Returns false (with the streams stopped) when cancelled.
    fn settle(&self, room: &Room, streams: Vec<StreamTopic>) -> bool {
        let inner = &self.inner;
        let mut gate = {
            let mut state = inner.state.write();
            if self.cancel_requested() {
                streams.iter().for_each(StreamTopic::stop);
                return false;
            }
            *inner.streams.lock() = streams;
            *inner.room.write() = Some(room.clone());
            inner.router.bind(Some(room.code.clone()));
            *state = ConnectionState::Connected;
            inner.gate.lock()
        };

        if let Gate::Holding(held) = std::mem::replace(&mut *gate, Gate::Open) {
            for item in held {
                inner.router.dispatch(&item.key, item.event);
            }
        }
        drop(gate);

        inner.status.emit(&ConnectionStatus::StateChanged(ConnectionState::Connected));
        true
    }

    /// Ask an in-flight connect to unwind once registration settles
    ///
    /// Returns false when no connect is in flight.
    pub fn cancel(&self) -> bool {
        let state = self.inner.state.read();
        if *state != ConnectionState::Connecting {
            return false;
        }
        self.inner.cancel_requested.store(true, Ordering::SeqCst);
        info!("Cancel requested");
        true
    }

    /// Stop streaming, drop presence and zero the counters
    ///
    /// Calling it again (or while not connected) does nothing. While
    /// connecting it behaves like [`cancel`](Self::cancel).
    pub async fn leave(&self) {
        let inner = &self.inner;
        {
            let mut state = inner.state.write();
            let current = *state;
            match current {
                ConnectionState::Connected => *state = ConnectionState::Idle,
                ConnectionState::Connecting => {
                    inner.cancel_requested.store(true, Ordering::SeqCst);
                    info!("Leave requested while connecting, cancelling");
                    return;
                }
                other => {
                    debug!("Leave ignored in state {:?}", other);
                    return;
                }
            }
        }

        *inner.gate.lock() = Gate::Closed;
        for stream in inner.streams.lock().drain(..) {
            stream.stop();
        }

        let room = inner.room.write().take();
        inner.router.reset();
        inner.router.bind(None);
        inner.status.emit(&ConnectionStatus::StateChanged(ConnectionState::Idle));

        if let Some(room) = room {
            remove_presence(inner.log.as_ref(), &room.code).await;
            info!("Left room {}", room.code);
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The hosted room while connected
    pub fn room(&self) -> Option<Room> {
        self.inner.room.read().clone()
    }

    /// Cutoff of the latest connect attempt
    pub fn cutoff(&self) -> Option<Timestamp> {
        *self.inner.cutoff.read()
    }

    pub fn router(&self) -> Arc<ReactionRouter> {
        self.inner.router.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Subscribe to state changes and transport loss
    pub fn on_status<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.inner.status.subscribe(callback)
    }

    fn cancel_requested(&self) -> bool {
        self.inner.cancel_requested.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.inner.state.write() = state;
        self.inner.status.emit(&ConnectionStatus::StateChanged(state));
    }

    /// Tear down a connect attempt, ending in `state`
    async fn unwind(&self, code: &RoomCode, state: ConnectionState) {
        *self.inner.gate.lock() = Gate::Closed;
        self.inner.router.reset();
        remove_presence(self.inner.log.as_ref(), code).await;
        self.set_state(state);
        info!("Connect to {} ended as {:?}", code, state);
    }

    /// Undo a registration that lands after its connect timed out
    fn spawn_late_cleanup(
        &self,
        registration: tokio::task::JoinHandle<Result<()>>,
        code: RoomCode,
        generation: u64,
    ) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let landed = matches!(registration.await, Ok(Ok(())));
            if !landed {
                return;
            }

            let reclaimed = {
                let state = inner.state.read();
                let active = matches!(
                    *state,
                    ConnectionState::Connecting | ConnectionState::Connected
                );
                active
                    && inner.generation.load(Ordering::SeqCst) != generation
                    && inner.target.read().as_ref() == Some(&code)
            };
            if reclaimed {
                debug!("Late registration for {} superseded, keeping presence", code);
                return;
            }

            debug!("Removing late registration for {}", code);
            remove_presence(inner.log.as_ref(), &code).await;
        });
    }

    fn topic_sink(
        &self,
        kind: TopicKind,
        cutoff: Timestamp,
    ) -> impl Fn(TopicSignal) + Send + Sync + 'static {
        let gate = self.inner.gate.clone();
        let router = self.inner.router.clone();
        let status = self.inner.status.clone();

        move |signal| match signal {
            TopicSignal::Item(item) => {
                if item.event.timestamp() < cutoff {
                    debug!(
                        "Dropping {} item {} from before cutoff ({} < {})",
                        kind,
                        item.key,
                        item.event.timestamp(),
                        cutoff
                    );
                    return;
                }
                let mut gate = gate.lock();
                match &mut *gate {
                    Gate::Closed => {}
                    Gate::Holding(held) => held.push(item),
                    Gate::Open => {
                        router.dispatch(&item.key, item.event);
                    }
                }
            }
            TopicSignal::Lost { reason } => {
                if !matches!(*gate.lock(), Gate::Closed) {
                    status.emit(&ConnectionStatus::TransportLost { topic: kind, reason });
                }
            }
        }
    }
}

impl std::fmt::Debug for RoomConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomConnection")
            .field("state", &self.state())
            .field("room", &self.room())
            .finish()
    }
}

/// Write the presence entry and confirm it reads back active
async fn register(log: Arc<dyn EventLog>, room: Room) -> Result<()> {
    let host_path = room.code.host_path();
    let presence = serde_json::to_value(room.presence())
        .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

    log.write(&host_path, presence)
        .await
        .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

    let confirmed = log
        .read_once(&host_path)
        .await
        .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

    match serde_json::from_value::<HostPresence>(confirmed) {
        Ok(presence) if presence.host_active => {
            debug!("Presence confirmed for {}", room.code);
            Ok(())
        }
        _ => Err(ClientError::ConnectionFailed(format!(
            "presence for {} was not confirmed",
            room.code
        ))),
    }
}

/// Best-effort removal of a room; failures are logged and swallowed
async fn remove_presence(log: &dyn EventLog, code: &RoomCode) {
    if let Err(e) = log.delete(&code.path()).await {
        warn!("Failed to remove room {}: {}", code, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_connect() {
        assert!(ConnectionState::Idle.can_connect());
        assert!(ConnectionState::Failed.can_connect());
        assert!(ConnectionState::TimedOut.can_connect());
        assert!(ConnectionState::Cancelled.can_connect());
        assert!(!ConnectionState::Connecting.can_connect());
        assert!(!ConnectionState::Connected.can_connect());
    }
}
