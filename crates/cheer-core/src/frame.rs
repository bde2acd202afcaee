//! Stream frame model
//!
//! A streaming subscription delivers `put` and `patch` frames whose `path` is
//! relative to the subscribed location:
//! ```text
//! put   /            -> Bulk    (full backlog, never dispatched)
//! put   /{key}       -> Single  (one item added, replaced or removed)
//! patch /            -> Multi   (several items touched at once)
//! put   /{key}/...   -> Nested  (field-level change inside one item)
//! patch /{key}/...   -> Nested
//! ```

use serde_json::Value;

use crate::{Error, Result};

/// One decoded frame from a topic stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Full contents of the subscribed location
    Bulk(Value),
    /// A single item keyed directly under the subscribed location
    Single { key: String, value: Value },
    /// Several items written in one update
    Multi(Vec<(String, Value)>),
    /// A change below an item (e.g. `/{key}/answered`)
    Nested { key: String, path: String, value: Value },
}

/// Split a relative frame path into its non-empty segments
fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl StreamFrame {
    /// Classify a `put` frame
    pub fn from_put(path: &str, data: Value) -> Self {
        let segs = segments(path);
        match segs.as_slice() {
            [] => StreamFrame::Bulk(data),
            [key] => StreamFrame::Single {
                key: (*key).to_string(),
                value: data,
            },
            [key, rest @ ..] => StreamFrame::Nested {
                key: (*key).to_string(),
                path: rest.join("/"),
                value: data,
            },
        }
    }

    /// Classify a `patch` frame
    ///
    /// A root patch must carry an object of `key -> value` pairs.
    pub fn from_patch(path: &str, data: Value) -> Result<Self> {
        let segs = segments(path);
        match segs.as_slice() {
            [] => match data {
                Value::Object(map) => Ok(StreamFrame::Multi(map.into_iter().collect())),
                other => Err(Error::Frame(format!(
                    "root patch must be an object, got {}",
                    other
                ))),
            },
            [key, rest @ ..] => Ok(StreamFrame::Nested {
                key: (*key).to_string(),
                path: rest.join("/"),
                value: data,
            }),
        }
    }

    /// True for the initial backlog frame
    pub fn is_bulk(&self) -> bool {
        matches!(self, StreamFrame::Bulk(_))
    }
}
