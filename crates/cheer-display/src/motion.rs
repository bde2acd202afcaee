//! Motion model for floating visuals
//!
//! Every visual rises from the bottom edge of its container, sways sideways
//! on a sine wave, shrinks from full size to 70% and fades out over the last
//! 30% of its lifetime. The randomized parts are drawn once per spawn into
//! [`MotionParams`]; [`MotionParams::sample`] is pure.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Lifetime of one visual, in milliseconds
pub const DURATION_MS: RangeInclusive<u64> = 2500..=4000;

/// Rendered size, in pixels
pub const SIZE_PX: RangeInclusive<f32> = 40.0..=64.0;

/// Horizontal margin kept clear on both sides
pub const MARGIN_PX: f32 = 20.0;

/// Peak sideways displacement, in pixels
pub const SWAY_AMOUNT_PX: RangeInclusive<f32> = 15.0..=40.0;

/// Full sway cycles over the lifetime
pub const SWAY_FREQUENCY: RangeInclusive<f32> = 1.5..=3.0;

/// Scale at the end of the lifetime
pub const END_SCALE: f32 = 0.7;

/// Progress after which opacity starts dropping
pub const FADE_START: f32 = 0.7;

/// Size of the area visuals float across
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Randomized parameters of one visual's flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub duration: Duration,
    pub size: f32,
    /// Left edge at spawn time
    pub start_x: f32,
    /// -1.0 or +1.0
    pub sway_direction: f32,
    pub sway_frequency: f32,
    pub sway_amount: f32,
}

/// Where and how a visual is drawn on one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisualState {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub scale: f32,
    pub opacity: f32,
}

/// Cubic ease-out: fast start, slow finish
pub fn ease_out_cubic(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

impl MotionParams {
    /// Draw fresh parameters for a visual inside `bounds`
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, bounds: Bounds) -> Self {
        let size = rng.gen_range(SIZE_PX);
        let duration = Duration::from_millis(rng.gen_range(DURATION_MS));

        let min_x = MARGIN_PX;
        let max_x = bounds.width - size - MARGIN_PX;
        let start_x = if max_x > min_x {
            rng.gen_range(min_x..=max_x)
        } else {
            ((bounds.width - size) / 2.0).max(0.0)
        };

        Self {
            duration,
            size,
            start_x,
            sway_direction: if rng.gen_bool(0.5) { 1.0 } else { -1.0 },
            sway_frequency: rng.gen_range(SWAY_FREQUENCY),
            sway_amount: rng.gen_range(SWAY_AMOUNT_PX),
        }
    }

    /// Progress in `[0, 1]` after `elapsed`
    pub fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    /// Visual state at `progress` within a container of height `bounds.height`
    pub fn sample(&self, progress: f32, bounds: Bounds) -> VisualState {
        let p = progress.clamp(0.0, 1.0);

        let travel = bounds.height + self.size;
        let y = bounds.height - ease_out_cubic(p) * travel;
        let sway = (p * self.sway_frequency * TAU).sin();
        let x = self.start_x + sway * self.sway_amount * self.sway_direction;

        let opacity = if p <= FADE_START {
            1.0
        } else {
            (1.0 - (p - FADE_START) / (1.0 - FADE_START)).max(0.0)
        };

        VisualState {
            x,
            y,
            size: self.size,
            scale: 1.0 - (1.0 - END_SCALE) * p,
            opacity,
        }
    }
}
