//! In-memory event log
//!
//! Stores the log as a single JSON tree and streams changes to subscribers
//! with the same frame semantics as the HTTP log: a bulk frame on subscribe,
//! then `put`/`patch` frames relative to the subscribed location. Writes to
//! an ancestor of a subscription arrive as a fresh bulk frame.
//!
//! Failure and latency can be injected for exercising connection handling.

use async_trait::async_trait;
use cheer_core::StreamFrame;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{LogError, Result};
use crate::path::{relative, segments};
use crate::traits::{EventLog, LogEvent, LogReceiver};

/// A completed mutation, in the order it was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOp {
    Write(String),
    Update(String),
    Push(String),
    Delete(String),
}

struct Subscriber {
    path: Vec<String>,
    tx: mpsc::UnboundedSender<LogEvent>,
}

#[derive(Default)]
struct Faults {
    fail_writes: Option<String>,
    fail_deletes: Option<String>,
    write_delay: Option<Duration>,
    subscribe_delay: Option<Duration>,
}

#[derive(Default)]
struct MemoryState {
    root: Value,
    subscribers: Vec<Subscriber>,
    faults: Faults,
    history: Vec<LogOp>,
}

/// In-process event log; clones share the same tree
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value at `path` without going through the async API
    pub fn value(&self, path: &str) -> Value {
        match segments(path) {
            Ok(segs) => snapshot(&self.state.lock().root, &segs),
            Err(_) => Value::Null,
        }
    }

    /// Every applied mutation so far
    pub fn history(&self) -> Vec<LogOp> {
        self.state.lock().history.clone()
    }

    /// Number of times `op` was applied
    pub fn count(&self, op: &LogOp) -> usize {
        self.state.lock().history.iter().filter(|o| *o == op).count()
    }

    /// Live subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.subscribers.retain(|s| !s.tx.is_closed());
        state.subscribers.len()
    }

    /// Make writes (and pushes/updates) fail with `reason`
    pub fn set_write_failure(&self, reason: Option<&str>) {
        self.state.lock().faults.fail_writes = reason.map(str::to_string);
    }

    /// Make deletes fail with `reason`
    pub fn set_delete_failure(&self, reason: Option<&str>) {
        self.state.lock().faults.fail_deletes = reason.map(str::to_string);
    }

    /// Hold every write for `delay` before applying it
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.state.lock().faults.write_delay = delay;
    }

    /// Hold every new subscription for `delay` before it is registered
    pub fn set_subscribe_delay(&self, delay: Option<Duration>) {
        self.state.lock().faults.subscribe_delay = delay;
    }

    /// Sever every subscription as if the connection dropped
    pub fn drop_subscriptions(&self, reason: &str) {
        let subscribers = std::mem::take(&mut self.state.lock().subscribers);
        debug!("Dropping {} subscription(s): {}", subscribers.len(), reason);

        for sub in subscribers {
            let _ = sub.tx.send(LogEvent::Error(reason.to_string()));
            let _ = sub.tx.send(LogEvent::Disconnected {
                reason: Some(reason.to_string()),
            });
        }
    }

    async fn delay_write(&self) {
        let delay = self.state.lock().faults.write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_write(state: &MemoryState) -> Result<()> {
        match &state.faults.fail_writes {
            Some(reason) => Err(LogError::Other(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Clone of the subtree at `segs`, `null` when absent
fn snapshot(root: &Value, segs: &[String]) -> Value {
    segs.iter()
        .try_fold(root, |node, seg| node.get(seg.as_str()))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Set the subtree at `segs`, creating intermediate objects
fn assign(root: &mut Value, segs: &[String], value: Value) {
    if value.is_null() {
        remove(root, segs);
        return;
    }

    let mut node = root;
    for seg in segs {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node.as_object_mut() {
            Some(map) => map.entry(seg.clone()).or_insert(Value::Null),
            None => return,
        };
    }
    *node = value;
}

/// Remove the subtree at `segs`, pruning parents left empty
///
/// Returns true when `node` itself ended up empty.
fn remove(node: &mut Value, segs: &[String]) -> bool {
    let Some((first, rest)) = segs.split_first() else {
        *node = Value::Null;
        return true;
    };

    let empty = match node {
        Value::Object(map) => {
            let child_empty = map
                .get_mut(first.as_str())
                .map(|child| remove(child, rest))
                .unwrap_or(false);
            if child_empty {
                map.remove(first.as_str());
            }
            map.is_empty()
        }
        _ => false,
    };

    if empty {
        *node = Value::Null;
    }
    empty
}

impl MemoryState {
    fn prune(&mut self) {
        self.subscribers.retain(|s| !s.tx.is_closed());
    }

    fn apply_put(&mut self, segs: &[String], value: Value) {
        assign(&mut self.root, segs, value.clone());
        self.prune();

        for sub in &self.subscribers {
            let frame = if segs.starts_with(&sub.path) {
                StreamFrame::from_put(&relative(&segs[sub.path.len()..]), value.clone())
            } else if sub.path.starts_with(segs) {
                StreamFrame::Bulk(snapshot(&self.root, &sub.path))
            } else {
                continue;
            };
            let _ = sub.tx.send(LogEvent::Frame(frame));
        }
    }

    fn apply_patch(&mut self, segs: &[String], values: Map<String, Value>) {
        for (key, value) in &values {
            let mut child = segs.to_vec();
            child.push(key.clone());
            assign(&mut self.root, &child, value.clone());
        }
        self.prune();

        for sub in &self.subscribers {
            let frame = if segs.starts_with(&sub.path) {
                match StreamFrame::from_patch(
                    &relative(&segs[sub.path.len()..]),
                    Value::Object(values.clone()),
                ) {
                    Ok(frame) => frame,
                    Err(_) => continue,
                }
            } else if sub.path.starts_with(segs) && values.contains_key(&sub.path[segs.len()]) {
                StreamFrame::Bulk(snapshot(&self.root, &sub.path))
            } else {
                continue;
            };
            let _ = sub.tx.send(LogEvent::Frame(frame));
        }
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let segs = segments(path)?;
        self.delay_write().await;

        let mut state = self.state.lock();
        Self::check_write(&state)?;
        state.apply_put(&segs, value);
        state.history.push(LogOp::Write(path.to_string()));
        Ok(())
    }

    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<()> {
        let segs = segments(path)?;
        for key in values.keys() {
            segments(key)?;
        }
        self.delay_write().await;

        let mut state = self.state.lock();
        Self::check_write(&state)?;
        state.apply_patch(&segs, values);
        state.history.push(LogOp::Update(path.to_string()));
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let mut segs = segments(path)?;
        let key = format!("-{}", Uuid::new_v4().simple());
        self.delay_write().await;

        let mut state = self.state.lock();
        Self::check_write(&state)?;
        segs.push(key.clone());
        state.apply_put(&segs, value);
        state.history.push(LogOp::Push(path.to_string()));
        Ok(key)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let segs = segments(path)?;

        let mut state = self.state.lock();
        if let Some(reason) = &state.faults.fail_deletes {
            return Err(LogError::Other(reason.clone()));
        }
        state.apply_put(&segs, Value::Null);
        state.history.push(LogOp::Delete(path.to_string()));
        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Value> {
        let segs = segments(path)?;
        Ok(snapshot(&self.state.lock().root, &segs))
    }

    async fn subscribe(&self, path: &str) -> Result<LogReceiver> {
        let segs = segments(path)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let delay = self.state.lock().faults.subscribe_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let _ = tx.send(LogEvent::Frame(StreamFrame::Bulk(snapshot(&state.root, &segs))));
        state.subscribers.push(Subscriber { path: segs, tx });

        debug!("Subscribed to {}", path);
        Ok(LogReceiver::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        segments(path).unwrap()
    }

    #[test]
    fn test_assign_and_remove_prunes_parents() {
        let mut root = Value::Null;
        assign(&mut root, &segs("rooms/abc/host"), json!({"hostActive": true}));
        assign(&mut root, &segs("rooms/xyz/host"), json!(1));

        remove(&mut root, &segs("rooms/abc/host"));
        assert_eq!(root, json!({"rooms": {"xyz": {"host": 1}}}));

        remove(&mut root, &segs("rooms/xyz"));
        assert_eq!(root, Value::Null);
    }

    #[test]
    fn test_snapshot_missing_is_null() {
        let root = json!({"a": {"b": 1}});
        assert_eq!(snapshot(&root, &segs("a/b")), json!(1));
        assert_eq!(snapshot(&root, &segs("a/c")), Value::Null);
        assert_eq!(snapshot(&root, &segs("a/b/c")), Value::Null);
    }
}
