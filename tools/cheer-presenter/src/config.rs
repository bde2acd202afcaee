//! Presenter configuration
//!
//! Read from a TOML file. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.
//!
//! ```toml
//! database_url = "https://example-rtdb.firebaseio.com"
//! connect_timeout_secs = 10
//! click_through = true
//!
//! [container]
//! width = 2560.0
//! height = 1440.0
//!
//! [[secondary_displays]]
//! id = "projector"
//! bounds = { width = 1920.0, height = 1080.0 }
//! ```

use cheer_display::{Bounds, DisplayInfo, MAX_FRAME_RATE, POOL_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{PresenterError, Result};

/// Id of the display the presenter itself draws on
pub const PRIMARY_DISPLAY_ID: &str = "primary";

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_capacity() -> usize {
    POOL_CAPACITY
}

fn default_frame_rate() -> u32 {
    cheer_display::DEFAULT_FRAME_RATE
}

fn default_enabled() -> bool {
    true
}

/// How secondary displays are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceMode {
    /// A pool and animator in this process
    #[default]
    InProcess,
    /// A `cheer overlay` child process fed over stdin
    Overlay,
}

/// One secondary display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryDisplay {
    pub id: String,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Everything the presenter can be configured with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterConfig {
    /// Event log root; `None` runs against an in-memory log
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Slots per surface
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Size of the primary display's container
    #[serde(default)]
    pub container: Bounds,
    #[serde(default)]
    pub secondary_displays: Vec<SecondaryDisplay>,
    #[serde(default)]
    pub secondary_mode: SurfaceMode,
    #[serde(default)]
    pub click_through: bool,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            connect_timeout_secs: default_connect_timeout(),
            pool_capacity: default_pool_capacity(),
            frame_rate: default_frame_rate(),
            container: Bounds::default(),
            secondary_displays: Vec::new(),
            secondary_mode: SurfaceMode::default(),
            click_through: false,
        }
    }
}

impl PresenterConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PresenterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(PresenterError::Config(
                "connect_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.pool_capacity == 0 {
            return Err(PresenterError::Config(
                "pool_capacity must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            return Err(PresenterError::Config(format!(
                "frame_rate must be between 1 and {}",
                MAX_FRAME_RATE
            )));
        }
        Ok(())
    }

    /// Load `path`, or the default location when `None`
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (default_config_file(), false),
        };

        if !path.exists() {
            if required {
                return Err(PresenterError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The primary display followed by every configured secondary
    pub fn displays(&self) -> Vec<DisplayInfo> {
        std::iter::once(DisplayInfo::new(PRIMARY_DISPLAY_ID, self.container, true))
            .chain(
                self.secondary_displays
                    .iter()
                    .map(|d| DisplayInfo::new(&d.id, d.bounds, false)),
            )
            .collect()
    }
}

/// `<config dir>/cheer/presenter.toml`
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cheer")
        .join("presenter.toml")
}
