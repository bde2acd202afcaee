//! Frame driver for an animation pool

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

use crate::pool::SharedPool;

/// Frames per second when none is configured
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Highest frame rate an animator will run at
pub const MAX_FRAME_RATE: u32 = 1000;

/// Ticks a pool on a fixed interval until stopped or dropped
pub struct Animator {
    frame_interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl Animator {
    /// Start ticking `pool` at `frame_rate` frames per second
    ///
    /// The rate is clamped to `1..=MAX_FRAME_RATE`. Must be called from
    /// within a tokio runtime.
    pub fn start(pool: SharedPool, frame_rate: u32) -> Self {
        let frame_interval = Duration::from_secs(1) / frame_rate.clamp(1, MAX_FRAME_RATE);

        let task = tokio::spawn(async move {
            let mut ticker = interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let finished = pool.lock().tick(Instant::now());
                if finished > 0 {
                    debug!("{} visual(s) finished", finished);
                }
            }
        });

        Self {
            frame_interval,
            task: Some(task),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Stop ticking; later calls do nothing
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        self.stop();
    }
}
