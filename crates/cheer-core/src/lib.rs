//! Cheer Core
//!
//! Core types and wire decoding shared by every Cheer crate.
//!
//! This crate provides:
//! - Room codes, presence records and event-log paths ([`RoomCode`], [`Room`])
//! - Typed topic events and their decode/validate step ([`TopicEvent`])
//! - The stream frame model ([`StreamFrame`])
//! - Server-sent event decoding for streaming subscriptions ([`codec`])
//! - Epoch-millisecond timestamps and injectable clocks ([`time`])

pub mod codec;
pub mod error;
pub mod event;
pub mod frame;
pub mod room;
pub mod time;

pub use codec::{SseDecoder, SseEvent, StreamMessage};
pub use error::{Error, Result};
pub use event::{PaceLevel, PaceVote, Question, Reaction, TopicEvent, TopicKind};
pub use frame::StreamFrame;
pub use room::{HostPresence, Room, RoomCode, FORBIDDEN_ROOM_CODE_CHARS, MIN_ROOM_CODE_LEN};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};

/// Root of every room in the event log
pub const ROOMS_ROOT: &str = "rooms";

/// Location producers write free-form feedback to
pub const FEEDBACK_PATH: &str = "feedback";

/// Child key holding a room's host presence entry
pub const HOST_KEY: &str = "host";
