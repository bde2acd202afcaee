//! Event log trait definitions

use async_trait::async_trait;
use cheer_core::StreamFrame;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Events delivered on a subscription
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    /// A data frame (the first one is always the bulk snapshot)
    Frame(StreamFrame),
    /// Error reported by the stream; the subscription may still be alive
    Error(String),
    /// Subscription ended (clean or error)
    Disconnected { reason: Option<String> },
}

/// Receiving end of a subscription
///
/// Dropping the receiver ends the subscription.
pub struct LogReceiver {
    rx: mpsc::UnboundedReceiver<LogEvent>,
    task: Option<JoinHandle<()>>,
}

impl LogReceiver {
    /// Wrap a channel fed by the log itself
    pub fn new(rx: mpsc::UnboundedReceiver<LogEvent>) -> Self {
        Self { rx, task: None }
    }

    /// Wrap a channel fed by a reader task that should die with the receiver
    pub fn with_task(rx: mpsc::UnboundedReceiver<LogEvent>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Receive the next event
    pub async fn recv(&mut self) -> Option<LogEvent> {
        self.rx.recv().await
    }
}

impl Drop for LogReceiver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// The remote event log a room lives in
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Replace the value at `path` (`null` removes it)
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Write several children of `path` in one update
    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<()>;

    /// Append `value` under a freshly generated child key, returning the key
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Remove the value at `path`
    async fn delete(&self, path: &str) -> Result<()>;

    /// Read the current value at `path` (`null` if absent)
    async fn read_once(&self, path: &str) -> Result<Value>;

    /// Stream `path`: one bulk frame, then incremental frames
    async fn subscribe(&self, path: &str) -> Result<LogReceiver>;
}
