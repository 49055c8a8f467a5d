//! Injectable clocks.
//!
//! Nothing in Sessionward reads the system time directly. Components take
//! a [`SharedClock`] and ask it for `now()`, which makes every expiry
//! decision reproducible in tests.
//!
//! Two implementations ship with the crate:
//!
//! - [`TokioClock`] — for real use. It is anchored to wall time once and
//!   then advanced by Tokio's monotonic `Instant`, so it moves in lockstep
//!   with `tokio::time::sleep` (including under `tokio::time::pause()`).
//! - [`ManualClock`] — for tests that don't need a runtime at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

use crate::Timestamp;

/// A source of "now".
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// The clock type passed around between components.
pub type SharedClock = Arc<dyn Clock>;

// ---------------------------------------------------------------------------
// TokioClock
// ---------------------------------------------------------------------------

/// Wall-anchored clock driven by Tokio's monotonic time.
///
/// Reading wall time once at construction and then only adding elapsed
/// monotonic time means a system clock change mid-session cannot shorten
/// or lengthen an access window.
#[derive(Debug, Clone)]
pub struct TokioClock {
    anchor: Timestamp,
    origin: Instant,
}

impl TokioClock {
    /// Anchors the clock at the current wall time.
    pub fn new() -> Self {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let millis = u64::try_from(wall.as_millis()).unwrap_or(u64::MAX);
        Self::starting_at(Timestamp::from_millis(millis))
    }

    /// Anchors the clock at an explicit timestamp. Tests use this with
    /// `Timestamp::EPOCH` so scenario times read as plain seconds.
    pub fn starting_at(anchor: Timestamp) -> Self {
        Self {
            anchor,
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.anchor + self.origin.elapsed()
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
///
/// Cloning shares the underlying time, so a test can keep one copy and
/// hand another to the component under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start.as_millis())),
        }
    }

    /// Jumps to an absolute time. Going backwards is allowed; it is how
    /// tests can exercise the "never move an expiry backwards" rules.
    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let step = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(step, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new(Timestamp::from_secs(5));
        assert_eq!(clock.now(), Timestamp::from_secs(5));

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Timestamp::from_millis(5_250));

        clock.set(Timestamp::from_secs(1));
        assert_eq!(clock.now(), Timestamp::from_secs(1));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let a = ManualClock::new(Timestamp::EPOCH);
        let b = a.clone();
        a.advance(Duration::from_secs(3));
        assert_eq!(b.now(), Timestamp::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::starting_at(Timestamp::EPOCH);
        assert_eq!(clock.now(), Timestamp::EPOCH);

        tokio::time::advance(Duration::from_secs(90)).await;

        assert_eq!(clock.now(), Timestamp::from_secs(90));
    }

    #[test]
    fn test_tokio_clock_new_is_after_epoch() {
        let clock = TokioClock::new();
        assert!(clock.now() > Timestamp::EPOCH);
    }
}
