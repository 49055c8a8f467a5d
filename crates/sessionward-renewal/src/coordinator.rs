//! The renewal coordinator: one refresh at a time, applied consistently.
//!
//! # Lifecycle of a renewal
//!
//! ```text
//! renew(kind) ──→ single-flight join ──┬──→ (leader) mark in flight
//!                                      │         │
//!                                      │         ▼
//!                                      │    actions.refresh(kind).await
//!                                      │         │
//!                                      │         ▼
//!                                      │    apply result to the store
//!                                      │         │
//!                                      └─────────┴──→ every caller gets
//!                                                     the same outcome
//! ```
//!
//! The bookkeeping and the store update live *inside* the shared future,
//! so they happen exactly once per network call no matter how many
//! callers joined.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use sessionward_store::{SessionRecord, SessionStore};
use sessionward_types::{
    AccessGrant, RenewalKind, SharedClock, Timestamp, TransitionKind, UserInfo,
};
use tracing::{debug, info, warn};

use crate::{ActionError, RenewalFailure, SessionActions, SingleFlight};

/// Every renewal kind shares this key: at most one refresh is ever on the
/// wire, whichever path asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FlightKey {
    Refresh,
}

// ---------------------------------------------------------------------------
// RenewalOutcome
// ---------------------------------------------------------------------------

/// The result every caller of a renewal receives.
#[derive(Debug, Clone, PartialEq)]
pub enum RenewalOutcome {
    /// The store now holds the new credential and an open access window.
    Success {
        /// The kind of the renewal that actually ran. A caller that joined
        /// an in-flight renewal sees the leader's kind here.
        kind: RenewalKind,
        access_window: Duration,
        /// The new access-window expiry, always after the moment of success.
        expiry: Timestamp,
        user: UserInfo,
    },
    Failure(RenewalFailure),
}

impl RenewalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn failure(&self) -> Option<&RenewalFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            Self::Success { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RenewalCoordinator
// ---------------------------------------------------------------------------

struct CoordinatorInner<A> {
    actions: Arc<A>,
    store: SessionStore,
    clock: SharedClock,
    /// Used when the backend's grant doesn't say how long the window is.
    default_window: Duration,
    flights: SingleFlight<FlightKey, RenewalOutcome>,
}

/// Performs renewals against [`SessionActions`] and applies the results to
/// the [`SessionStore`].
///
/// Cheap to clone; clones share the same in-flight map.
pub struct RenewalCoordinator<A> {
    inner: Arc<CoordinatorInner<A>>,
}

impl<A> Clone for RenewalCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: SessionActions> RenewalCoordinator<A> {
    pub fn new(
        actions: Arc<A>,
        store: SessionStore,
        clock: SharedClock,
        default_window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                actions,
                store,
                clock,
                default_window,
                flights: SingleFlight::new(),
            }),
        }
    }

    /// The backend this coordinator renews against.
    pub fn actions(&self) -> &Arc<A> {
        &self.inner.actions
    }

    /// `true` while a refresh is on the wire.
    pub fn is_in_flight(&self) -> bool {
        self.inner.flights.is_in_flight(&FlightKey::Refresh)
    }

    /// Renews the session, or joins the renewal already in progress.
    ///
    /// Network errors never escape as `Err`: they come back as
    /// [`RenewalOutcome::Failure`], and the caller decides what a failure
    /// means for the session.
    pub async fn renew(&self, kind: RenewalKind) -> RenewalOutcome {
        let inner = Arc::clone(&self.inner);
        self.inner
            .flights
            .run(FlightKey::Refresh, move || {
                async move { inner.perform(kind).await }.boxed()
            })
            .await
    }

    /// Silent keep-alive while the access window is still open and the
    /// user is active. Identical to `renew(KeepAlive)`.
    pub async fn proactive_renew(&self) -> RenewalOutcome {
        self.renew(RenewalKind::KeepAlive).await
    }
}

impl<A: SessionActions> CoordinatorInner<A> {
    async fn perform(&self, kind: RenewalKind) -> RenewalOutcome {
        if let Err(failure) = self.store.modify(|record| begin(record, kind)) {
            debug!(%kind, %failure, "renewal not started");
            return RenewalOutcome::Failure(failure);
        }

        debug!(%kind, "renewal started");
        let mut guard = InFlightGuard {
            store: &self.store,
            armed: true,
        };
        let result = self.actions.refresh(kind).await;
        guard.armed = false;
        let outcome = self.apply(kind, result);

        match &outcome {
            RenewalOutcome::Success { user, expiry, .. } => {
                info!(%kind, user_id = %user.id, %expiry, "session renewed");
            }
            RenewalOutcome::Failure(failure) => {
                warn!(%kind, %failure, "renewal failed");
            }
        }
        outcome
    }

    fn apply(&self, kind: RenewalKind, result: Result<AccessGrant, ActionError>) -> RenewalOutcome {
        let now = self.clock.now();

        self.store.modify(|record| {
            record.refresh_in_progress = false;
            if record.transition_kind == TransitionKind::ContinueToWork {
                record.transition_kind = TransitionKind::None;
            }

            let grant = match result {
                Ok(grant) => grant,
                Err(err) => return RenewalOutcome::Failure(err.into()),
            };

            // A logout that raced this renewal wins.
            let superseded = record.transition_kind == TransitionKind::Logout
                || (kind != RenewalKind::SilentRestoration && !record.access_token_present());
            if superseded {
                return RenewalOutcome::Failure(RenewalFailure::Superseded);
            }

            let token = match grant.token() {
                Ok(token) => token,
                Err(err) => return RenewalOutcome::Failure(err.into()),
            };

            let window = grant.window_or(self.default_window);
            let expiry = now + window;

            record.cancel_auto_terminate();
            record.access_token = Some(token);
            record.access_window = Some(window);
            record.access_window_expiry = Some(expiry);
            record.credential_expiry = Some(expiry);
            record.renewal_countdown_expiry = None;
            record.modal_visible = false;
            record.transition_kind = TransitionKind::None;
            record.user = Some(grant.user.clone());

            match kind {
                RenewalKind::SilentRestoration => {
                    record.last_activity_at = Some(now);
                    record.last_modal_shown_at = None;
                }
                RenewalKind::ManualContinue => record.last_activity_at = Some(now),
                RenewalKind::KeepAlive => {}
            }

            RenewalOutcome::Success {
                kind,
                access_window: window,
                expiry,
                user: grant.user,
            }
        })
    }
}

/// Marks a renewal as in flight, or refuses to start one.
fn begin(record: &mut SessionRecord, kind: RenewalKind) -> Result<(), RenewalFailure> {
    if record.transition_kind == TransitionKind::Logout {
        return Err(RenewalFailure::Superseded);
    }
    if kind != RenewalKind::SilentRestoration && !record.access_token_present() {
        return Err(RenewalFailure::SignedOut);
    }

    record.refresh_in_progress = true;
    if kind == RenewalKind::ManualContinue {
        record.transition_kind = TransitionKind::ContinueToWork;
    }
    Ok(())
}

/// Undoes the in-flight markers if the renewal future is dropped before
/// the network call returns.
struct InFlightGuard<'a> {
    store: &'a SessionStore,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.store.modify(|record| {
            record.refresh_in_progress = false;
            if record.transition_kind == TransitionKind::ContinueToWork {
                record.transition_kind = TransitionKind::None;
            }
        });
        debug!("renewal abandoned before completion");
    }
}
