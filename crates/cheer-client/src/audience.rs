//! Producer side of a room
//!
//! Audience members never subscribe; they check the room is live and push
//! timestamped items into its topics.

use cheer_core::{
    Clock, HostPresence, PaceLevel, PaceVote, Question, Reaction, RoomCode, TopicEvent, TopicKind,
    FEEDBACK_PATH,
};
use cheer_transport::EventLog;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Pushes reactions, pace votes and questions into a live room
pub struct AudienceClient {
    log: Arc<dyn EventLog>,
    clock: Arc<dyn Clock>,
    code: RoomCode,
}

impl AudienceClient {
    /// Join `raw_code`, failing with [`ClientError::RoomNotLive`] if no host
    /// is present
    pub async fn join(log: Arc<dyn EventLog>, clock: Arc<dyn Clock>, raw_code: &str) -> Result<Self> {
        let code = RoomCode::parse(raw_code)?;
        let presence = log.read_once(&code.host_path()).await?;

        let live = serde_json::from_value::<HostPresence>(presence)
            .map(|p| p.host_active)
            .unwrap_or(false);
        if !live {
            return Err(ClientError::RoomNotLive(code.to_string()));
        }

        debug!("Joined room {}", code);
        Ok(Self { log, clock, code })
    }

    pub fn room(&self) -> &RoomCode {
        &self.code
    }

    /// Send an emoji reaction; returns the item key
    pub async fn react(&self, emoji: &str) -> Result<String> {
        let emoji = non_empty(emoji, "emoji")?;
        self.send(TopicEvent::Reaction(Reaction {
            emoji,
            timestamp: self.clock.now(),
        }))
        .await
    }

    /// Send a pace vote; returns the item key
    pub async fn pace(&self, level: PaceLevel) -> Result<String> {
        self.send(TopicEvent::Pace(PaceVote {
            level,
            timestamp: self.clock.now(),
        }))
        .await
    }

    /// Ask a question; returns its id
    pub async fn ask(&self, text: &str) -> Result<String> {
        let text = non_empty(text, "question")?;
        self.send(TopicEvent::Question(Question {
            id: String::new(),
            text,
            answered: false,
            timestamp: self.clock.now(),
        }))
        .await
    }

    /// Leave free-form feedback (not tied to the room)
    pub async fn feedback(&self, message: &str) -> Result<String> {
        let message = non_empty(message, "feedback")?;
        let record = json!({
            "room": self.code.as_str(),
            "message": message,
            "timestamp": self.clock.now(),
        });
        Ok(self.log.push(FEEDBACK_PATH, record).await?)
    }

    async fn send(&self, event: TopicEvent) -> Result<String> {
        let kind: TopicKind = event.kind();
        let key = self.log.push(&self.code.topic_path(kind), event.to_json()).await?;
        debug!("Sent {} item {} to {}", kind, key, self.code);
        Ok(key)
    }
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}
