//! HTTP event log
//!
//! Talks to a realtime-database style REST endpoint: every location is
//! `{base}/{path}.json`, mutations are `PUT`/`PATCH`/`POST`/`DELETE`, and a
//! `GET` with `Accept: text/event-stream` streams changes as server-sent
//! events.

use async_trait::async_trait;
use cheer_core::codec::{decode_event, SseDecoder, StreamMessage};
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{LogError, Result};
use crate::path::segments;
use crate::traits::{EventLog, LogEvent, LogReceiver};

/// HTTP event log configuration
#[derive(Debug, Clone)]
pub struct HttpLogConfig {
    /// Database root, e.g. `https://example-rtdb.firebaseio.com`
    pub base_url: String,
    /// Optional `auth` token appended to every request
    pub auth_token: Option<String>,
    /// Timeout for one-shot requests (streams are not bounded)
    pub request_timeout: Duration,
}

impl HttpLogConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Response body of a `POST` (push)
#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// Event log backed by a REST + SSE endpoint
#[derive(Clone)]
pub struct HttpEventLog {
    config: HttpLogConfig,
    client: Client,
}

impl HttpEventLog {
    pub fn new(config: HttpLogConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| LogError::Request(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> Result<String> {
        let segs = segments(path)?;
        Ok(format!("{}/{}.json", self.config.base_url, segs.join("/")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    fn one_shot(&self, request: RequestBuilder) -> RequestBuilder {
        self.authorize(request).timeout(self.config.request_timeout)
    }
}

#[async_trait]
impl EventLog for HttpEventLog {
    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let url = self.url(path)?;
        self.one_shot(self.client.put(&url))
            .json(&value)
            .send()
            .await?
            .error_for_status()?;
        debug!("PUT {}", path);
        Ok(())
    }

    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<()> {
        let url = self.url(path)?;
        self.one_shot(self.client.patch(&url))
            .json(&values)
            .send()
            .await?
            .error_for_status()?;
        debug!("PATCH {}", path);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let url = self.url(path)?;
        let response: PushResponse = self
            .one_shot(self.client.post(&url))
            .json(&value)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("POST {} -> {}", path, response.name);
        Ok(response.name)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        self.one_shot(self.client.delete(&url))
            .send()
            .await?
            .error_for_status()?;
        debug!("DELETE {}", path);
        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        let value = self
            .one_shot(self.client.get(&url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }

    async fn subscribe(&self, path: &str) -> Result<LogReceiver> {
        let url = self.url(path)?;
        let response = self
            .authorize(self.client.get(&url))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        info!("Streaming {}", path);

        let (tx, rx) = mpsc::unbounded_channel();
        let path = path.to_string();

        let task = tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut body = response.bytes_stream();

            let reason = loop {
                let chunk = match body.next().await {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => {
                        let error = LogError::Stream(e.to_string()).to_string();
                        let _ = tx.send(LogEvent::Error(error.clone()));
                        break Some(error);
                    }
                    None => break Some("stream ended".to_string()),
                };

                let mut closed = None;
                for event in decoder.feed(&chunk) {
                    match decode_event(&event) {
                        Ok(StreamMessage::Frame(frame)) => {
                            if tx.send(LogEvent::Frame(frame)).is_err() {
                                return;
                            }
                        }
                        Ok(StreamMessage::KeepAlive) => {}
                        Ok(StreamMessage::Cancel(detail)) => {
                            closed = Some(format!("cancelled by server: {}", detail));
                        }
                        Ok(StreamMessage::AuthRevoked) => {
                            closed = Some("auth revoked".to_string());
                        }
                        Err(e) => {
                            warn!("Dropping undecodable event on {}: {}", path, e);
                        }
                    }
                }

                if let Some(reason) = closed {
                    let _ = tx.send(LogEvent::Error(reason.clone()));
                    break Some(reason);
                }
            };

            info!("Stream {} closed: {:?}", path, reason);
            let _ = tx.send(LogEvent::Disconnected { reason });
        });

        Ok(LogReceiver::with_task(rx, task))
    }
}
