//! Expiry calculators: pure questions about the record and the clock.
//!
//! The free functions take plain values and are what the state machine's
//! tests pin down. [`ExpiryCalculators`] binds them to a store and a clock
//! for callers that just want to ask "right now?". None of these ever
//! write to the store, and absent data yields `false`/`None`, never an
//! error.

use std::time::Duration;

use sessionward_types::{SharedClock, Timestamp};

use crate::SessionStore;

/// The access window is open: an expiry is set and `now` is before it.
pub fn access_window_open(expiry: Option<Timestamp>, now: Timestamp) -> bool {
    matches!(expiry, Some(expiry) if now < expiry)
}

/// The renewal countdown has run out: one is running and `now` reached it.
pub fn countdown_expired(countdown: Option<Timestamp>, now: Timestamp) -> bool {
    matches!(countdown, Some(countdown) if now >= countdown)
}

/// Time left until `deadline`, or `None` if there is no deadline.
/// A deadline in the past yields `Some(Duration::ZERO)`.
pub fn remaining_until(deadline: Option<Timestamp>, now: Timestamp) -> Option<Duration> {
    deadline.map(|deadline| now.duration_until(deadline))
}

/// The user has been inactive for at least `threshold`.
///
/// No recorded activity at all counts as idle.
pub fn user_idle(last_activity: Option<Timestamp>, now: Timestamp, threshold: Duration) -> bool {
    match last_activity {
        Some(last) => now.saturating_duration_since(last) >= threshold,
        None => true,
    }
}

/// Expiry queries bound to a store and a clock.
#[derive(Clone)]
pub struct ExpiryCalculators {
    store: SessionStore,
    clock: SharedClock,
}

impl ExpiryCalculators {
    pub fn new(store: SessionStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// `access_window_expiry` is set and still in the future.
    pub fn is_access_window_open(&self) -> bool {
        access_window_open(self.store.access_window_expiry(), self.now())
    }

    /// A countdown is running and has reached its expiry.
    pub fn is_countdown_expired(&self) -> bool {
        countdown_expired(self.store.renewal_countdown_expiry(), self.now())
    }

    /// The running countdown has `threshold` or less remaining.
    ///
    /// Only meaningful while a countdown exists; `false` otherwise.
    /// Activity plays no part in this answer.
    pub fn countdown_needs_renewal(&self, threshold: Duration) -> bool {
        self.countdown_remaining()
            .is_some_and(|remaining| remaining <= threshold)
    }

    /// No activity for at least `threshold`. This is the coarse idle
    /// signal used by the proactive-refresh heuristic; it is independent
    /// of the access window.
    pub fn is_user_idle(&self, threshold: Duration) -> bool {
        user_idle(self.store.last_activity_at(), self.now(), threshold)
    }

    pub fn access_window_remaining(&self) -> Option<Duration> {
        remaining_until(self.store.access_window_expiry(), self.now())
    }

    /// Time left on the credential itself, independent of activity.
    pub fn credential_remaining(&self) -> Option<Duration> {
        remaining_until(self.store.credential_expiry(), self.now())
    }

    pub fn countdown_remaining(&self) -> Option<Duration> {
        remaining_until(self.store.renewal_countdown_expiry(), self.now())
    }
}
