//! The activity tracker: interaction signals in, access-window slides out.
//!
//! # The pulse rule
//!
//! ```text
//! now = clock()
//! countdown running          → nothing (the countdown is immune to activity)
//! now >= access_window_expiry → nothing (activity cannot reopen the window)
//! otherwise                  → last_activity_at = now
//!                              access_window_expiry = now + access_window
//! ```
//!
//! The read-compare-write happens under one store lock, and both fields
//! only ever move forward, so interleaved pulses can't drag them backwards.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sessionward_store::SessionStore;
use sessionward_types::{SharedClock, Timestamp, WardConfig};
use tracing::trace;

use crate::{FocusProbe, Signal, SignalCategory, SignalSource, Subscription};

/// Called after every pulse that reached the store, so the state machine
/// can reconcile without waiting for its next poll.
pub type PulseHook = Arc<dyn Fn() + Send + Sync>;

/// What a signal or pulse ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// The access window slid forward to `expiry`.
    Extended { expiry: Timestamp },
    /// The window had already closed; nothing changed.
    WindowClosed,
    /// A renewal countdown is running; nothing changed.
    CountdownRunning,
    /// No credential is held; nothing changed.
    SignedOut,
    /// The signal was synthetic and ignored.
    Synthetic,
    /// The host was unfocused and the pulse suppressed.
    Unfocused,
}

impl PulseOutcome {
    pub fn is_extended(self) -> bool {
        matches!(self, Self::Extended { .. })
    }

    /// Whether this outcome was decided against the store (and so is worth
    /// telling the state machine about).
    fn reached_store(self) -> bool {
        matches!(
            self,
            Self::Extended { .. } | Self::WindowClosed | Self::CountdownRunning
        )
    }
}

/// The subset of [`WardConfig`] the tracker needs.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Window length used when the session record carries none.
    pub access_window: Duration,
    /// Throttle applied to high-frequency categories.
    pub throttle: Duration,
    pub require_focus: bool,
}

impl From<&WardConfig> for TrackerConfig {
    fn from(config: &WardConfig) -> Self {
        Self {
            access_window: config.access_window,
            throttle: config.activity_throttle,
            require_focus: config.require_focus,
        }
    }
}

struct TrackerInner {
    store: SessionStore,
    clock: SharedClock,
    config: TrackerConfig,
    focus: Arc<dyn FocusProbe>,
    hook: Mutex<Option<PulseHook>>,
}

/// Converts interaction signals into activity pulses.
///
/// Cheap to clone; clones share the same hook and focus probe.
#[derive(Clone)]
pub struct ActivityTracker {
    inner: Arc<TrackerInner>,
}

impl ActivityTracker {
    pub fn new(
        store: SessionStore,
        clock: SharedClock,
        config: TrackerConfig,
        focus: Arc<dyn FocusProbe>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                store,
                clock,
                config,
                focus,
                hook: Mutex::new(None),
            }),
        }
    }

    /// Installs the hook run after each pulse that reached the store.
    pub fn set_pulse_hook(&self, hook: PulseHook) {
        *self
            .inner
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    /// Subscribes to every signal category on `source`, throttling the
    /// high-frequency ones. Keep the returned subscriptions alive for as
    /// long as tracking should continue.
    pub fn attach(&self, source: &dyn SignalSource) -> Vec<Subscription> {
        SignalCategory::ALL
            .into_iter()
            .map(|category| {
                let throttle = category
                    .is_high_frequency()
                    .then_some(self.inner.config.throttle);
                let tracker = self.clone();
                source.subscribe(
                    category,
                    throttle,
                    Arc::new(move |signal| {
                        tracker.handle_signal(signal);
                    }),
                )
            })
            .collect()
    }

    /// Applies the genuineness and focus filters, then pulses.
    pub fn handle_signal(&self, signal: Signal) -> PulseOutcome {
        if !signal.genuine {
            trace!(category = %signal.category, "synthetic signal ignored");
            return PulseOutcome::Synthetic;
        }

        match signal.category {
            SignalCategory::Focus => self.inner.focus.focus_changed(true),
            SignalCategory::Blur => self.inner.focus.focus_changed(false),
            _ => {}
        }

        if self.inner.config.require_focus && !self.inner.focus.is_focused() {
            trace!(category = %signal.category, "pulse suppressed, host unfocused");
            return PulseOutcome::Unfocused;
        }

        self.pulse()
    }

    /// Records one unit of activity against the session store.
    ///
    /// This bypasses the signal filters; it is what `notify_activity()`
    /// on the public surface calls.
    pub fn pulse(&self) -> PulseOutcome {
        let now = self.inner.clock.now();
        let fallback = self.inner.config.access_window;

        let outcome = self.inner.store.modify(|record| {
            if !record.access_token_present() {
                return PulseOutcome::SignedOut;
            }
            if record.renewal_countdown_expiry.is_some() {
                return PulseOutcome::CountdownRunning;
            }
            if matches!(record.access_window_expiry, Some(expiry) if now >= expiry) {
                return PulseOutcome::WindowClosed;
            }

            let window = record.access_window.unwrap_or(fallback);
            let expiry = record
                .access_window_expiry
                .map_or(now + window, |current| current.max(now + window));
            record.access_window_expiry = Some(expiry);
            record.last_activity_at = Some(record.last_activity_at.map_or(now, |at| at.max(now)));
            PulseOutcome::Extended { expiry }
        });

        trace!(?outcome, %now, "activity pulse");

        if outcome.reached_store() {
            let hook = self
                .inner
                .hook
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(hook) = hook {
                hook();
            }
        }

        outcome
    }
}
