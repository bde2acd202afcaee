//! Cheer Transport Layer
//!
//! Access to the remote event log that rooms live in:
//! - [`MemoryEventLog`]: in-process log with the same streaming semantics,
//!   used for local sessions and tests
//! - [`HttpEventLog`]: realtime-database style REST endpoint with
//!   server-sent event streaming (feature `http`, on by default)

pub mod error;
pub mod memory;
pub mod path;
pub mod traits;

#[cfg(feature = "http")]
pub mod http;

pub use error::{LogError, Result};
pub use memory::{LogOp, MemoryEventLog};
pub use traits::{EventLog, LogEvent, LogReceiver};

#[cfg(feature = "http")]
pub use http::{HttpEventLog, HttpLogConfig};
