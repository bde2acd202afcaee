//! Event log error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LogError>;

#[derive(Error, Debug, Clone)]
pub enum LogError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("event log error: {0}")]
    Other(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for LogError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => LogError::Status {
                status: status.as_u16(),
                path: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
            },
            None => LogError::Request(e.to_string()),
        }
    }
}
