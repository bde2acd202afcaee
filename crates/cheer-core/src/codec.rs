//! Server-sent event decoding for streaming subscriptions
//!
//! The streaming endpoint answers with `text/event-stream`:
//! ```text
//! event: put
//! data: {"path":"/","data":{...}}
//!
//! event: keep-alive
//! data: null
//!
//! ```
//! [`SseDecoder`] turns arbitrary byte chunks into complete [`SseEvent`]s and
//! [`decode_event`] classifies each one into a [`StreamMessage`].

use bytes::{Buf, BytesMut};
use serde::Deserialize;

use crate::frame::StreamFrame;
use crate::{Error, Result};

/// One complete server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental line-oriented SSE parser
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completes
    ///
    /// Chunks may split lines (and UTF-8 sequences) anywhere; incomplete
    /// lines stay buffered until the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);

            let mut line = String::from_utf8_lossy(&line).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }

        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = self.data.join("\n");
        self.data.clear();

        Some(SseEvent { event, data })
    }
}

/// A classified streaming message
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// A data frame for the subscription
    Frame(StreamFrame),
    /// Heartbeat, nothing to do
    KeepAlive,
    /// Server closed the subscription (e.g. rules changed)
    Cancel(String),
    /// Credentials are no longer valid
    AuthRevoked,
}

#[derive(Deserialize)]
struct FramePayload {
    path: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Classify one server-sent event
pub fn decode_event(event: &SseEvent) -> Result<StreamMessage> {
    match event.event.as_str() {
        "put" => {
            let payload: FramePayload = serde_json::from_str(&event.data)?;
            Ok(StreamMessage::Frame(StreamFrame::from_put(
                &payload.path,
                payload.data,
            )))
        }
        "patch" => {
            let payload: FramePayload = serde_json::from_str(&event.data)?;
            Ok(StreamMessage::Frame(StreamFrame::from_patch(
                &payload.path,
                payload.data,
            )?))
        }
        "keep-alive" => Ok(StreamMessage::KeepAlive),
        "cancel" => Ok(StreamMessage::Cancel(event.data.clone())),
        "auth_revoked" => Ok(StreamMessage::AuthRevoked),
        other => Err(Error::Frame(format!("unknown stream event: {}", other))),
    }
}
