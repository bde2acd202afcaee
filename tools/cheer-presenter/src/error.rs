//! Presenter error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PresenterError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("client error: {0}")]
    Client(#[from] cheer_client::ClientError),

    #[error("display error: {0}")]
    Display(#[from] cheer_display::DisplayError),

    #[error("transport error: {0}")]
    Transport(#[from] cheer_transport::LogError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PresenterError>;
