//! Room codes and event-log addressing
//!
//! A room code is case-insensitive: it is trimmed and lowercased before it is
//! used as a path segment, so `" ABC12 "` and `"abc12"` name the same room.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::event::TopicKind;
use crate::time::Timestamp;
use crate::{Error, Result, HOST_KEY, ROOMS_ROOT};

/// Shortest accepted room code (after trimming)
pub const MIN_ROOM_CODE_LEN: usize = 2;

/// Characters a room code may not contain: the path separator and the
/// characters the event log refuses in keys
pub const FORBIDDEN_ROOM_CODE_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// A normalized room code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    /// Validate and normalize a user-supplied code
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();

        if normalized.chars().count() < MIN_ROOM_CODE_LEN {
            return Err(Error::InvalidRoomCode {
                code: raw.to_string(),
                reason: "must be at least 2 characters",
            });
        }

        if normalized.contains(&FORBIDDEN_ROOM_CODE_CHARS[..]) {
            return Err(Error::InvalidRoomCode {
                code: raw.to_string(),
                reason: "must not contain any of / . # $ [ ]",
            });
        }

        Ok(Self(normalized))
    }

    /// The normalized code
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `rooms/{code}`
    pub fn path(&self) -> String {
        format!("{}/{}", ROOMS_ROOT, self.0)
    }

    /// `rooms/{code}/host`
    pub fn host_path(&self) -> String {
        format!("{}/{}/{}", ROOMS_ROOT, self.0, HOST_KEY)
    }

    /// `rooms/{code}/{topic}`
    pub fn topic_path(&self, kind: TopicKind) -> String {
        format!("{}/{}/{}", ROOMS_ROOT, self.0, kind.segment())
    }

    /// `rooms/{code}/questions/{id}`
    pub fn question_path(&self, id: &str) -> String {
        format!("{}/{}", self.topic_path(TopicKind::Questions), id)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Presence entry stored at `rooms/{code}/host`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPresence {
    pub host_active: bool,
    pub created_at: Timestamp,
}

/// A room held by this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub code: RoomCode,
    pub host_active: bool,
    pub created_at: Timestamp,
}

impl Room {
    /// A freshly hosted room
    pub fn new(code: RoomCode, created_at: Timestamp) -> Self {
        Self {
            code,
            host_active: true,
            created_at,
        }
    }

    /// The presence record to write for this room
    pub fn presence(&self) -> HostPresence {
        HostPresence {
            host_active: self.host_active,
            created_at: self.created_at,
        }
    }
}
