//! Client error types

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid room code: {0}")]
    InvalidRoomCode(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection cancelled")]
    Cancelled,

    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("room {0} is not live")]
    RoomNotLive(String),

    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("event log error: {0}")]
    Log(#[from] cheer_transport::LogError),

    #[error("protocol error: {0}")]
    Core(cheer_core::Error),
}

impl From<cheer_core::Error> for ClientError {
    fn from(e: cheer_core::Error) -> Self {
        match e {
            cheer_core::Error::InvalidRoomCode { .. } => ClientError::InvalidRoomCode(e.to_string()),
            other => ClientError::Core(other),
        }
    }
}
