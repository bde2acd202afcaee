//! Display error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DisplayError>;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("surface closed: {0}")]
    SurfaceClosed(String),

    #[error("message encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
