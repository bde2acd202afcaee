//! Topic kinds and typed topic events
//!
//! Raw payloads from the event log are loosely typed JSON. [`TopicEvent::decode`]
//! is the single place they become typed values; anything that fails
//! validation is a [`Error::Decode`] and never reaches a handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time::Timestamp;
use crate::{Error, Result};

/// Event stream categories in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Reactions,
    Pace,
    Questions,
}

impl TopicKind {
    /// Every topic a presenter subscribes to
    pub const ALL: [TopicKind; 3] = [TopicKind::Reactions, TopicKind::Pace, TopicKind::Questions];

    /// Path segment under `rooms/{code}`
    pub fn segment(&self) -> &'static str {
        match self {
            TopicKind::Reactions => "reactions",
            TopicKind::Pace => "pace",
            TopicKind::Questions => "questions",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Audience pace feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaceLevel {
    Slow,
    Good,
    Fast,
}

impl PaceLevel {
    pub const ALL: [PaceLevel; 3] = [PaceLevel::Slow, PaceLevel::Good, PaceLevel::Fast];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaceLevel::Slow => "slow",
            PaceLevel::Good => "good",
            PaceLevel::Fast => "fast",
        }
    }
}

impl FromStr for PaceLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(PaceLevel::Slow),
            "good" => Ok(PaceLevel::Good),
            "fast" => Ok(PaceLevel::Fast),
            _ => Err(Error::UnknownPaceLevel(s.to_string())),
        }
    }
}

impl fmt::Display for PaceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An emoji reaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub timestamp: Timestamp,
}

/// A pace vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaceVote {
    pub level: PaceLevel,
    pub timestamp: Timestamp,
}

/// Wire shape of a pace vote; the level is parsed case-insensitively
#[derive(Deserialize)]
struct RawPaceVote {
    level: String,
    timestamp: Timestamp,
}

/// An audience question
///
/// The id is the item key in the event log, so it is not part of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(skip)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub answered: bool,
    pub timestamp: Timestamp,
}

/// A decoded event from one of the room topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicEvent {
    Reaction(Reaction),
    Pace(PaceVote),
    Question(Question),
}

impl TopicEvent {
    /// Producer-assigned timestamp
    pub fn timestamp(&self) -> Timestamp {
        match self {
            TopicEvent::Reaction(r) => r.timestamp,
            TopicEvent::Pace(p) => p.timestamp,
            TopicEvent::Question(q) => q.timestamp,
        }
    }

    /// Topic this event belongs to
    pub fn kind(&self) -> TopicKind {
        match self {
            TopicEvent::Reaction(_) => TopicKind::Reactions,
            TopicEvent::Pace(_) => TopicKind::Pace,
            TopicEvent::Question(_) => TopicKind::Questions,
        }
    }

    /// Decode and validate the payload stored under `key` in `kind`'s topic
    pub fn decode(kind: TopicKind, key: &str, value: &serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Decode(format!(
                "{}/{}: expected an object, got {}",
                kind, key, value
            )));
        }

        match kind {
            TopicKind::Reactions => {
                let reaction: Reaction = serde_json::from_value(value.clone())?;
                if reaction.emoji.trim().is_empty() {
                    return Err(Error::Decode(format!("{}/{}: empty emoji", kind, key)));
                }
                Ok(TopicEvent::Reaction(reaction))
            }
            TopicKind::Pace => {
                let raw: RawPaceVote = serde_json::from_value(value.clone())?;
                Ok(TopicEvent::Pace(PaceVote {
                    level: raw.level.parse()?,
                    timestamp: raw.timestamp,
                }))
            }
            TopicKind::Questions => {
                let mut question: Question = serde_json::from_value(value.clone())?;
                if question.text.trim().is_empty() {
                    return Err(Error::Decode(format!("{}/{}: empty question", kind, key)));
                }
                question.id = key.to_string();
                Ok(TopicEvent::Question(question))
            }
        }
    }

    /// Payload a producer writes for this event
    pub fn to_json(&self) -> serde_json::Value {
        let encoded = match self {
            TopicEvent::Reaction(r) => serde_json::to_value(r),
            TopicEvent::Pace(p) => serde_json::to_value(p),
            TopicEvent::Question(q) => serde_json::to_value(q),
        };
        // Plain structs of strings, bools and integers always serialize
        encoded.unwrap_or(serde_json::Value::Null)
    }
}
