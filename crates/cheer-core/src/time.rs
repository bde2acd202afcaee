//! Timing utilities for Cheer
//!
//! Every timestamp in the event log is producer-assigned epoch milliseconds.
//! Components that need "now" take a [`Clock`] so tests can pin it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp type (epoch milliseconds)
pub type Timestamp = u64;

/// Get current Unix timestamp in milliseconds
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}

/// Convert milliseconds to Duration
pub fn to_duration(millis: Timestamp) -> Duration {
    Duration::from_millis(millis)
}

/// Convert Duration to milliseconds
pub fn from_duration(duration: Duration) -> Timestamp {
    duration.as_millis() as Timestamp
}

/// Source of epoch-millisecond time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in epoch milliseconds
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock pinned at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, millis: Timestamp) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move forward by `millis`
    pub fn advance(&self, millis: Timestamp) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_epoch_millis() {
        let ts = SystemClock.now();
        // 2020-01-01 in epoch millis
        assert!(ts > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1000);
        let other = clock.clone();

        clock.advance(500);
        assert_eq!(other.now(), 1500);

        other.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_duration_conversion() {
        assert_eq!(to_duration(2500), Duration::from_millis(2500));
        assert_eq!(from_duration(Duration::from_secs(10)), 10_000);
    }
}
