//! Error types for Cheer core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Room code failed validation
    #[error("invalid room code {code:?}: {reason}")]
    InvalidRoomCode { code: String, reason: &'static str },

    /// Payload could not be decoded into a topic event
    #[error("decode error: {0}")]
    Decode(String),

    /// Pace level outside slow/good/fast
    #[error("unknown pace level: {0}")]
    UnknownPaceLevel(String),

    /// Stream frame was structurally invalid
    #[error("invalid frame: {0}")]
    Frame(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
