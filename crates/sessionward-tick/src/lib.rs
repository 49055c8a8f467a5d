//! Timers for Sessionward.
//!
//! Two kinds of time-driven behavior feed the session state machine:
//!
//! - [`PollScheduler`] — the fixed-interval reconciliation trigger. It
//!   fires once per `poll_interval`, skips ahead (never bursts) after an
//!   overrun, and pends forever when polling is disabled. The first poll
//!   can be pushed back by a random jitter.
//! - [`schedule_once`] / [`TimerHandle`] — one-shot timers, used for the
//!   auto-terminate countdown. Each handle carries a unique id so a callback
//!   that fires after being superseded can recognize itself as stale.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside the checker's `tokio::select!`
//! loop next to the activity trigger:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         _ = activity.notified() => {}
//!         _ = scheduler.wait_for_tick() => {}
//!     }
//!     checker.reconcile().await;
//! }
//! ```

mod poll;
mod timer;

pub use poll::{PollConfig, PollInfo, PollScheduler};
pub use timer::{TimerHandle, TimerId, schedule_once};
