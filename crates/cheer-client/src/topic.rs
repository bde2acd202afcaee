//! Topic streams
//!
//! A [`StreamTopic`] owns one subscription and turns its frames into decoded
//! [`TopicItem`]s. The backlog handling lives in [`TopicCursor`], which has
//! no runtime dependencies:
//! - the bulk frame is swallowed and flips the cursor to live
//! - single items are forwarded only once live
//! - multi-item patches are forwarded item by item
//! - nested field updates and removals are never forwarded

use cheer_core::{StreamFrame, TopicEvent, TopicKind};
use cheer_transport::{EventLog, LogEvent};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Snapshot/live state of one subscription
#[derive(Debug, Clone, Default)]
pub struct TopicCursor {
    live: bool,
}

impl TopicCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the bulk snapshot has been seen
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Back to awaiting a snapshot (for a fresh subscription)
    pub fn reset(&mut self) {
        self.live = false;
    }

    /// Items in `frame` that should be dispatched
    pub fn accept(&mut self, frame: StreamFrame) -> Vec<(String, Value)> {
        match frame {
            StreamFrame::Bulk(_) => {
                if !self.live {
                    self.live = true;
                    debug!("Snapshot seen, topic is live");
                }
                Vec::new()
            }
            StreamFrame::Single { key, value } => {
                if !self.live {
                    debug!("Dropping item {} received before snapshot", key);
                    return Vec::new();
                }
                if value.is_null() {
                    debug!("Item {} removed", key);
                    return Vec::new();
                }
                vec![(key, value)]
            }
            StreamFrame::Multi(items) => items
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect(),
            StreamFrame::Nested { key, path, .. } => {
                debug!("Ignoring field update {}/{}", key, path);
                Vec::new()
            }
        }
    }
}

/// A decoded item and the key it is stored under
#[derive(Debug, Clone, PartialEq)]
pub struct TopicItem {
    pub key: String,
    pub event: TopicEvent,
}

/// What a topic hands to its sink
#[derive(Debug, Clone, PartialEq)]
pub enum TopicSignal {
    /// A live item
    Item(TopicItem),
    /// The subscription ended without being stopped
    Lost { reason: Option<String> },
}

/// A running subscription to one topic
pub struct StreamTopic {
    kind: TopicKind,
    path: String,
    live: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamTopic {
    /// Subscribe to `path` and start forwarding items of `kind` to `sink`
    ///
    /// The sink runs on the topic's task, in frame order.
    pub async fn open<F>(log: &dyn EventLog, path: &str, kind: TopicKind, sink: F) -> Result<Self>
    where
        F: Fn(TopicSignal) + Send + Sync + 'static,
    {
        let mut rx = log.subscribe(path).await?;
        info!("Opened {} stream at {}", kind, path);

        let live = Arc::new(AtomicBool::new(false));
        let live_flag = live.clone();

        let task = tokio::spawn(async move {
            let mut cursor = TopicCursor::new();

            let reason = loop {
                match rx.recv().await {
                    Some(LogEvent::Frame(frame)) => {
                        for (key, value) in cursor.accept(frame) {
                            match TopicEvent::decode(kind, &key, &value) {
                                Ok(event) => sink(TopicSignal::Item(TopicItem { key, event })),
                                Err(e) => warn!("Dropping malformed {} item {}: {}", kind, key, e),
                            }
                        }
                        live_flag.store(cursor.is_live(), Ordering::SeqCst);
                    }
                    Some(LogEvent::Error(e)) => {
                        warn!("{} stream error: {}", kind, e);
                    }
                    Some(LogEvent::Disconnected { reason }) => break reason,
                    None => break Some("subscription closed".to_string()),
                }
            };

            live_flag.store(false, Ordering::SeqCst);
            warn!("{} stream lost: {:?}", kind, reason);
            sink(TopicSignal::Lost { reason });
        });

        Ok(Self {
            kind,
            path: path.to_string(),
            live,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn kind(&self) -> TopicKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// True once the snapshot arrived and until the stream stops
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// True until stopped or lost
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// End the subscription; later calls do nothing
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            self.live.store(false, Ordering::SeqCst);
            debug!("Stopped {} stream", self.kind);
        }
    }
}

impl Drop for StreamTopic {
    fn drop(&mut self) {
        self.stop();
    }
}
