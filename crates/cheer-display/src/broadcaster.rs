//! Multi-display broadcast
//!
//! The primary display is drawn by the presenter itself; every secondary
//! display gets its own [`Surface`] with its own pool. A topology change
//! tears all of them down and builds them again, which also discards any
//! visuals still in flight.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::animator::DEFAULT_FRAME_RATE;
use crate::error::Result;
use crate::motion::Bounds;
use crate::pool::{AnimationPool, POOL_CAPACITY};
use crate::surface::{PoolSurface, Surface};

/// A physical display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub id: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub primary: bool,
}

impl DisplayInfo {
    pub fn new(id: &str, bounds: Bounds, primary: bool) -> Self {
        Self {
            id: id.to_string(),
            bounds,
            primary,
        }
    }
}

/// Builds the surface for a secondary display
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, display: &DisplayInfo) -> Result<Arc<dyn Surface>>;
}

impl<F> SurfaceFactory for F
where
    F: Fn(&DisplayInfo) -> Result<Arc<dyn Surface>> + Send + Sync,
{
    fn create(&self, display: &DisplayInfo) -> Result<Arc<dyn Surface>> {
        self(display)
    }
}

/// Factory for in-process pool surfaces
#[derive(Debug, Clone)]
pub struct PoolSurfaceFactory {
    pub capacity: usize,
    pub frame_rate: u32,
}

impl Default for PoolSurfaceFactory {
    fn default() -> Self {
        Self {
            capacity: POOL_CAPACITY,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

impl SurfaceFactory for PoolSurfaceFactory {
    fn create(&self, display: &DisplayInfo) -> Result<Arc<dyn Surface>> {
        let pool = AnimationPool::with_capacity(self.capacity, display.bounds);
        Ok(Arc::new(PoolSurface::start(&display.id, pool, self.frame_rate)))
    }
}

/// A secondary surface as seen from outside
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceInfo {
    pub id: String,
    pub enabled: bool,
}

struct SurfaceEntry {
    id: String,
    surface: Arc<dyn Surface>,
}

/// Fans spawns out to every enabled secondary display
pub struct DisplayBroadcaster {
    factory: Box<dyn SurfaceFactory>,
    surfaces: RwLock<Vec<SurfaceEntry>>,
    /// Remembered per display id; unknown displays are enabled
    enabled: RwLock<HashMap<String, bool>>,
    click_through: AtomicBool,
}

impl DisplayBroadcaster {
    pub fn new<F: SurfaceFactory + 'static>(factory: F) -> Self {
        Self {
            factory: Box::new(factory),
            surfaces: RwLock::new(Vec::new()),
            enabled: RwLock::new(HashMap::new()),
            click_through: AtomicBool::new(false),
        }
    }

    /// Rebuild surfaces for the current display set
    ///
    /// The primary display is skipped. Returns how many surfaces exist now.
    pub fn on_topology_change(&self, displays: &[DisplayInfo]) -> usize {
        self.clear();

        let click_through = self.click_through.load(Ordering::SeqCst);
        let mut created = Vec::new();

        for disp in displays.iter().filter(|d| !d.primary) {
            match self.factory.create(disp) {
                Ok(surface) => {
                    if let Err(e) = surface.set_click_through(click_through) {
                        warn!("Failed to set click-through on {}: {}", disp.id, e);
                    }
                    self.enabled.write().entry(disp.id.clone()).or_insert(true);
                    created.push(SurfaceEntry {
                        id: disp.id.clone(),
                        surface,
                    });
                }
                Err(e) => warn!("Failed to create surface for display {}: {}", disp.id, e),
            }
        }

        let count = created.len();
        *self.surfaces.write() = created;
        info!("Display topology changed: {} secondary surface(s)", count);
        count
    }

    /// Send `symbol` to every enabled surface; returns how many accepted it
    pub fn broadcast(&self, symbol: &str) -> usize {
        let enabled = self.enabled.read();
        let surfaces = self.surfaces.read();
        let mut delivered = 0;

        for entry in surfaces.iter() {
            if !enabled.get(&entry.id).copied().unwrap_or(true) {
                continue;
            }
            match entry.surface.spawn(symbol) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Broadcast to {} failed: {}", entry.id, e),
            }
        }
        delivered
    }

    /// Enable or disable one display; remembered across topology changes
    ///
    /// Returns false if no surface currently exists for it.
    pub fn set_enabled(&self, display_id: &str, enabled: bool) -> bool {
        self.enabled.write().insert(display_id.to_string(), enabled);
        debug!("Display {} enabled: {}", display_id, enabled);
        self.surfaces.read().iter().any(|e| e.id == display_id)
    }

    pub fn is_enabled(&self, display_id: &str) -> bool {
        self.enabled.read().get(display_id).copied().unwrap_or(true)
    }

    /// Apply click-through to every surface, now and after rebuilds
    pub fn set_click_through(&self, enabled: bool) {
        self.click_through.store(enabled, Ordering::SeqCst);
        for entry in self.surfaces.read().iter() {
            if let Err(e) = entry.surface.set_click_through(enabled) {
                warn!("Failed to set click-through on {}: {}", entry.id, e);
            }
        }
    }

    pub fn surfaces(&self) -> Vec<SurfaceInfo> {
        let enabled = self.enabled.read();
        self.surfaces
            .read()
            .iter()
            .map(|e| SurfaceInfo {
                id: e.id.clone(),
                enabled: enabled.get(&e.id).copied().unwrap_or(true),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.surfaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.read().is_empty()
    }

    /// Close and forget every surface
    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.surfaces.write());
        for entry in old {
            entry.surface.close();
        }
    }
}

impl Drop for DisplayBroadcaster {
    fn drop(&mut self) {
        self.clear();
    }
}
