//! Fixed-capacity animation pool
//!
//! All slots are allocated up front. A spawn claims a free slot or is
//! dropped; there is no queue. Slots return to the pool when their flight
//! finishes or on [`AnimationPool::clear`].

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::motion::{Bounds, MotionParams, VisualState};

/// Slots in a default pool
pub const POOL_CAPACITY: usize = 100;

/// Index of a slot in its pool
pub type SlotId = usize;

/// Pool shared between its surface and its animator
pub type SharedPool = Arc<Mutex<AnimationPool>>;

/// Identifies the in-flight frame callback driving one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// The drawable part of a slot
#[derive(Debug, Clone, Default)]
pub struct Visual {
    pub symbol: String,
    pub state: VisualState,
}

impl Visual {
    /// Reuse this visual for `symbol`, keeping the string's buffer
    fn reset(&mut self, symbol: &str) {
        self.symbol.clear();
        self.symbol.push_str(symbol);
        self.state = VisualState {
            scale: 1.0,
            opacity: 1.0,
            ..VisualState::default()
        };
    }
}

/// One reusable slot
#[derive(Debug, Clone)]
pub struct PoolSlot {
    visual: Visual,
    in_use: bool,
    frame: Option<FrameHandle>,
    motion: Option<MotionParams>,
    started: Option<Instant>,
}

impl PoolSlot {
    fn empty() -> Self {
        Self {
            visual: Visual {
                symbol: String::with_capacity(16),
                state: VisualState::default(),
            },
            in_use: false,
            frame: None,
            motion: None,
            started: None,
        }
    }

    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn frame(&self) -> Option<FrameHandle> {
        self.frame
    }

    pub fn motion(&self) -> Option<&MotionParams> {
        self.motion.as_ref()
    }

    fn release(&mut self) {
        self.in_use = false;
        self.frame = None;
        self.visual.state.opacity = 0.0;
    }
}

/// Pool of floating visuals for one surface
pub struct AnimationPool {
    slots: Vec<PoolSlot>,
    bounds: Bounds,
    rng: StdRng,
    next_frame: u64,
    active: usize,
    dropped: u64,
}

impl AnimationPool {
    /// Pool of [`POOL_CAPACITY`] slots
    pub fn new(bounds: Bounds) -> Self {
        Self::with_capacity(POOL_CAPACITY, bounds)
    }

    pub fn with_capacity(capacity: usize, bounds: Bounds) -> Self {
        Self::build(capacity, bounds, StdRng::from_entropy())
    }

    /// Deterministic pool: the same seed draws the same motions
    pub fn with_seed(capacity: usize, bounds: Bounds, seed: u64) -> Self {
        Self::build(capacity, bounds, StdRng::seed_from_u64(seed))
    }

    fn build(capacity: usize, bounds: Bounds, rng: StdRng) -> Self {
        Self {
            slots: (0..capacity).map(|_| PoolSlot::empty()).collect(),
            bounds,
            rng,
            next_frame: 0,
            active: 0,
            dropped: 0,
        }
    }

    /// Wrap in the lock shared with an [`Animator`](crate::Animator)
    pub fn shared(self) -> SharedPool {
        Arc::new(Mutex::new(self))
    }

    /// Start a visual for `symbol`; `None` when every slot is busy
    pub fn spawn(&mut self, symbol: &str, now: Instant) -> Option<SlotId> {
        let Some(id) = self.slots.iter().position(|slot| !slot.in_use) else {
            self.dropped += 1;
            warn!(
                "Animation pool exhausted ({} in use), dropping {}",
                self.slots.len(),
                symbol
            );
            return None;
        };

        let motion = MotionParams::draw(&mut self.rng, self.bounds);
        self.next_frame += 1;

        let slot = &mut self.slots[id];
        slot.visual.reset(symbol);
        slot.visual.state = motion.sample(0.0, self.bounds);
        slot.motion = Some(motion);
        slot.started = Some(now);
        slot.frame = Some(FrameHandle(self.next_frame));
        slot.in_use = true;
        self.active += 1;

        Some(id)
    }

    /// Advance every active visual to `now`; returns how many finished
    pub fn tick(&mut self, now: Instant) -> usize {
        let bounds = self.bounds;
        let mut finished = 0;

        for slot in self.slots.iter_mut().filter(|slot| slot.in_use) {
            let (Some(motion), Some(started)) = (slot.motion, slot.started) else {
                slot.release();
                finished += 1;
                continue;
            };

            let progress = motion.progress(now.saturating_duration_since(started));
            if progress >= 1.0 {
                slot.release();
                finished += 1;
            } else {
                slot.visual.state = motion.sample(progress, bounds);
            }
        }

        self.active -= finished;
        finished
    }

    /// Return every active slot immediately; returns how many were active
    pub fn clear(&mut self) -> usize {
        let cleared = self.active;
        for slot in self.slots.iter_mut().filter(|slot| slot.in_use) {
            slot.release();
        }
        self.active = 0;
        if cleared > 0 {
            debug!("Cleared {} active visual(s)", cleared);
        }
        cleared
    }

    /// Active visuals, for a renderer
    pub fn visuals(&self) -> impl Iterator<Item = (SlotId, &Visual)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.in_use)
            .map(|(id, slot)| (id, &slot.visual))
    }

    pub fn slot(&self, id: SlotId) -> Option<&PoolSlot> {
        self.slots.get(id)
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Spawns refused because the pool was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// New container size; applies to visuals spawned and ticked from now on
    pub fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }
}

impl std::fmt::Debug for AnimationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationPool")
            .field("capacity", &self.capacity())
            .field("active", &self.active)
            .field("dropped", &self.dropped)
            .field("bounds", &self.bounds)
            .finish()
    }
}
