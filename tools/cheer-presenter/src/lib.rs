//! Cheer Presenter
//!
//! Runtime for the presenter's machine: a [`PresenterContext`] connects to a
//! room and floats every live reaction across the primary display and any
//! secondary displays, configured through [`PresenterConfig`].
//!
//! # Example
//!
//! ```ignore
//! use cheer_presenter::{PresenterConfig, PresenterContext};
//! use cheer_transport::MemoryEventLog;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cheer_presenter::Result<()> {
//!     let config = PresenterConfig::load(None)?;
//!     let ctx = PresenterContext::from_config(&config, Arc::new(MemoryEventLog::new()), None)?;
//!
//!     ctx.init()?;
//!     ctx.connect("abc12").await?;
//!     // ...
//!     ctx.dispose().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod overlay;

pub use config::{default_config_file, PresenterConfig, SecondaryDisplay, SurfaceMode, PRIMARY_DISPLAY_ID};
pub use context::PresenterContext;
pub use error::{PresenterError, Result};
pub use overlay::{run_overlay, OverlayFactory};
