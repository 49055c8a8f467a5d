//! Fixed-interval reconciliation trigger.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the poll scheduler.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between polls. `Duration::ZERO` = event-driven (never fires).
    pub interval: Duration,
    /// Random delay (0–max) added to the *first* poll so many sessions
    /// started together don't reconcile in lockstep.
    pub initial_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_jitter: Duration::ZERO,
        }
    }
}

impl PollConfig {
    /// Shortest interval accepted. Anything faster just burns CPU; expiry
    /// arithmetic only has millisecond resolution anyway.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values. Zero stays zero (event-driven).
    pub fn validated(mut self) -> Self {
        if !self.interval.is_zero() && self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "poll interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Poll info
// ---------------------------------------------------------------------------

/// Returned by [`PollScheduler::wait_for_tick`] each time a poll fires.
#[derive(Debug, Clone)]
pub struct PollInfo {
    /// Monotonically increasing poll number (starts at 1).
    pub tick: u64,
    /// `true` if this poll fired more than one interval late.
    pub late: bool,
    /// Polls that were skipped because the loop fell behind.
    pub skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval poll trigger.
///
/// Missed polls are always skipped: a reconciliation pass reads current
/// state, so running three of them back to back after a stall would only
/// repeat the same decision.
pub struct PollScheduler {
    interval: Option<Duration>,
    next_tick: Option<Instant>,
    tick_count: u64,
    total_skipped: u64,
}

impl PollScheduler {
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();
        let interval = (!config.interval.is_zero()).then_some(config.interval);

        let next_tick = interval.map(|d| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max = config.initial_jitter.as_millis() as u64;
                Duration::from_millis(rand::rng().random_range(0..max.max(1)))
            };
            Instant::now() + d + jitter
        });

        match interval {
            Some(d) => debug!(
                interval_ms = d.as_millis() as u64,
                jitter_ms = config.initial_jitter.as_millis() as u64,
                "poll scheduler created"
            ),
            None => debug!("poll scheduler created in event-driven mode (no polling)"),
        }

        Self {
            interval,
            next_tick,
            tick_count: 0,
            total_skipped: 0,
        }
    }

    /// A scheduler polling every `interval`, no jitter.
    pub fn every(interval: Duration) -> Self {
        Self::new(PollConfig::every(interval))
    }

    /// Wait until the next poll is due.
    ///
    /// In event-driven mode this future never resolves, which lets
    /// `tokio::select!` keep serving its other branches.
    pub async fn wait_for_tick(&mut self) -> PollInfo {
        let (next, interval) = match (self.next_tick, self.interval) {
            (Some(next), Some(interval)) => (next, interval),
            _ => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
        let late = skipped > 0;
        if late {
            warn!(
                tick = self.tick_count,
                skipped,
                late_ms = late_by.as_millis() as u64,
                "reconciliation poll fell behind, skipping ahead"
            );
        }
        self.total_skipped += skipped;

        // Always schedule from now, not from the missed deadline.
        self.next_tick = Some(now + interval);

        trace!(tick = self.tick_count, late, "poll fired");

        PollInfo {
            tick: self.tick_count,
            late,
            skipped,
        }
    }

    pub fn is_event_driven(&self) -> bool {
        self.interval.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}
