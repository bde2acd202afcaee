//! Cheer Client Library
//!
//! Presenter-side room handling: connect to a room, stream its topics, drop
//! the backlog, and route live events to typed handlers.
//!
//! # Example
//!
//! ```ignore
//! use cheer_client::RoomConnection;
//! use cheer_transport::MemoryEventLog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cheer_client::Result<()> {
//!     let conn = RoomConnection::new(Arc::new(MemoryEventLog::new()));
//!
//!     let _reactions = conn.router().on_reaction(|reaction| {
//!         println!("{} at {}", reaction.emoji, reaction.timestamp);
//!     });
//!
//!     conn.connect("abc12").await?;
//!     // ...
//!     conn.leave().await;
//!     Ok(())
//! }
//! ```

pub mod audience;
pub mod builder;
pub mod connection;
pub mod error;
pub mod observer;
pub mod router;
pub mod topic;

pub use audience::AudienceClient;
pub use builder::{RoomConnectionBuilder, DEFAULT_CONNECT_TIMEOUT};
pub use connection::{ConnectionState, ConnectionStatus, RoomConnection};
pub use error::{ClientError, Result};
pub use observer::{Observers, SubscriptionHandle};
pub use router::{PaceCounts, ReactionRouter, DEDUP_WINDOW, QUESTION_CAPACITY};
pub use topic::{StreamTopic, TopicCursor, TopicItem, TopicSignal};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audience::AudienceClient;
    pub use crate::connection::{ConnectionState, ConnectionStatus, RoomConnection};
    pub use crate::error::{ClientError, Result};
    pub use crate::router::ReactionRouter;
    pub use cheer_core::{PaceLevel, PaceVote, Question, Reaction, RoomCode, TopicEvent};
}
