//! Messages to out-of-process overlay surfaces
//!
//! One JSON object per line:
//! ```text
//! {"type":"spawn-emoji","symbol":"🔥"}
//! {"type":"set-click-through","enabled":true}
//! ```

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::error::Result;

/// A request to an overlay surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceMessage {
    SpawnEmoji { symbol: String },
    SetClickThrough { enabled: bool },
}

impl SurfaceMessage {
    /// Encode as a single newline-terminated line
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Reads messages from a line stream (an overlay's stdin)
pub struct MessageReader<R> {
    reader: R,
    line: String,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Next valid message, or `None` at end of input
    ///
    /// Blank and undecodable lines are skipped.
    pub async fn next(&mut self) -> Result<Option<SurfaceMessage>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match SurfaceMessage::from_line(trimmed) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => warn!("Ignoring invalid surface message {:?}: {}", trimmed, e),
            }
        }
    }
}
