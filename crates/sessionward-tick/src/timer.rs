//! One-shot timers with identifiable, cancellable handles.
//!
//! A timer is a spawned task that sleeps and then runs a future. Its
//! [`TimerHandle`] can abort the task, but aborting and firing can race:
//! the sleep may complete on the same runtime turn the cancel is issued.
//! Callbacks therefore receive their own [`TimerId`] and are expected to
//! compare it against whatever handle is currently armed before acting.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::trace;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one scheduled timer. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Owning handle to a scheduled one-shot timer.
///
/// Dropping the handle does **not** cancel the timer; call
/// [`cancel`](Self::cancel). This keeps "forgot the handle" and "cancelled
/// the timer" distinct, which matters when a handle is moved out of shared
/// state by the very callback it controls.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    deadline: tokio::time::Instant,
    abort: AbortHandle,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// When the timer is (or was) due to fire.
    pub fn deadline(&self) -> tokio::time::Instant {
        self.deadline
    }

    /// Abort the timer task. Idempotent; a no-op if it already fired.
    pub fn cancel(&self) {
        trace!(timer = %self.id, "timer cancelled");
        self.abort.abort();
    }

    /// `true` once the task has run to completion or been aborted.
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Runs the future produced by `on_fire` after `delay`.
///
/// `on_fire` receives the timer's own id so it can check whether it is
/// still the armed timer. Must be called from within a Tokio runtime.
pub fn schedule_once<F, Fut>(delay: Duration, on_fire: F) -> TimerHandle
where
    F: FnOnce(TimerId) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let id = TimerId(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed));
    let deadline = tokio::time::Instant::now() + delay;

    let task = tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        trace!(timer = %id, "timer fired");
        on_fire(id).await;
    });

    TimerHandle {
        id,
        deadline,
        abort: task.abort_handle(),
    }
}
