//! Monotonic time source
//!
//! Backed by tokio's `Instant` so tests running on a paused runtime see
//! virtual time advance deterministically.

use tokio::time::Instant;

/// Provider of monotonic timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default clock reading tokio's monotonic time
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Whole milliseconds from `start` to `at`, zero if `at` is earlier
pub fn offset_ms(start: Instant, at: Instant) -> u64 {
    at.saturating_duration_since(start).as_millis() as u64
}
