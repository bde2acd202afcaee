//! Out-of-process overlays
//!
//! In overlay mode each secondary display is a `cheer overlay` child process.
//! The presenter side is an [`OverlayFactory`]; the child runs
//! [`run_overlay`] over its stdin.

use cheer_display::{
    DisplayError, DisplayInfo, IpcSurface, MessageReader, Surface, SurfaceFactory, SurfaceMessage,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::{debug, info, warn};

use crate::config::PresenterConfig;
use crate::error::Result;

/// Launches one overlay process per secondary display
#[derive(Debug, Clone)]
pub struct OverlayFactory {
    program: PathBuf,
    capacity: usize,
    frame_rate: u32,
}

impl OverlayFactory {
    pub fn new(program: &Path, config: &PresenterConfig) -> Self {
        Self {
            program: program.to_path_buf(),
            capacity: config.pool_capacity,
            frame_rate: config.frame_rate,
        }
    }

    /// Command-line arguments for the overlay serving `display`
    pub fn args(&self, display: &DisplayInfo) -> Vec<String> {
        vec![
            "overlay".to_string(),
            "--display".to_string(),
            display.id.clone(),
            "--width".to_string(),
            display.bounds.width.to_string(),
            "--height".to_string(),
            display.bounds.height.to_string(),
            "--capacity".to_string(),
            self.capacity.to_string(),
            "--frame-rate".to_string(),
            self.frame_rate.to_string(),
        ]
    }
}

impl SurfaceFactory for OverlayFactory {
    fn create(&self, display: &DisplayInfo) -> cheer_display::Result<Arc<dyn Surface>> {
        let program = self.program.to_string_lossy();
        let surface = IpcSurface::spawn_process(&display.id, &program, &self.args(display))?;
        Ok(Arc::new(surface))
    }
}

/// Apply messages from `reader` to `surface` until input ends
///
/// Returns how many messages were applied. A closed surface ends the loop.
pub async fn run_overlay<R>(mut reader: MessageReader<R>, surface: &dyn Surface) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut applied = 0;
    info!("Overlay for {} ready", surface.id());

    while let Some(message) = reader.next().await? {
        let result = match &message {
            SurfaceMessage::SpawnEmoji { symbol } => surface.spawn(symbol),
            SurfaceMessage::SetClickThrough { enabled } => surface.set_click_through(*enabled),
        };

        match result {
            Ok(()) => applied += 1,
            Err(DisplayError::SurfaceClosed(id)) => {
                debug!("Overlay surface {} closed, stopping", id);
                break;
            }
            Err(e) => warn!("Overlay failed to apply {:?}: {}", message, e),
        }
    }

    info!("Overlay for {} finished after {} message(s)", surface.id(), applied);
    Ok(applied)
}
