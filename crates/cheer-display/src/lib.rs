//! Cheer Display
//!
//! Everything between a routed reaction and pixels on a screen:
//! - [`motion`]: per-visual motion parameters and the easing curve
//! - [`AnimationPool`]: fixed-capacity pool of reusable visual slots
//! - [`Animator`]: frame driver ticking a pool on a tokio interval
//! - [`Surface`]: a render target, in-process ([`PoolSurface`]) or in an
//!   overlay process ([`IpcSurface`])
//! - [`DisplayBroadcaster`]: fan-out of spawns to secondary displays

pub mod animator;
pub mod broadcaster;
pub mod error;
pub mod ipc;
pub mod motion;
pub mod pool;
pub mod surface;

pub use animator::{Animator, DEFAULT_FRAME_RATE, MAX_FRAME_RATE};
pub use broadcaster::{
    DisplayBroadcaster, DisplayInfo, PoolSurfaceFactory, SurfaceFactory, SurfaceInfo,
};
pub use error::{DisplayError, Result};
pub use ipc::{MessageReader, SurfaceMessage};
pub use motion::{Bounds, MotionParams, VisualState};
pub use pool::{AnimationPool, FrameHandle, PoolSlot, SharedPool, SlotId, Visual, POOL_CAPACITY};
pub use surface::{IpcSurface, PoolSurface, Surface};
