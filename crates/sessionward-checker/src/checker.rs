//! The session checker: reconciliation and every phase transition.
//!
//! # One reconciliation tick
//!
//! ```text
//! terminated / signed out          → nothing to do
//! renewal or logout in flight      → step aside
//! prompt showing                   → step aside (the countdown runs alone),
//!                                    unless it ran out with no timer armed
//! window open                      → Valid, maybe renew proactively
//! window closed                    → AwaitingPrompt, then Prompting once
//!                                    the modal gate allows
//! ```
//!
//! Both triggers (the poll loop and activity pulses) call [`reconcile`],
//! and a running flag drops any call that arrives while another is still
//! in progress. Anything that goes wrong inside a tick (an error or a
//! panic) ends the session rather than leaving it in an unknown state.
//!
//! [`reconcile`]: SessionChecker::reconcile

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::FutureExt;
use sessionward_renewal::{RenewalCoordinator, RenewalFailure, RenewalOutcome, SessionActions};
use sessionward_store::{ExpiryCalculators, SessionRecord, SessionStore, access_window_open};
use sessionward_tick::{TimerHandle, TimerId, schedule_once};
use sessionward_types::{
    Credentials, RenewalKind, SharedClock, Timestamp, TransitionKind, UserInfo, WardConfig,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{CheckerError, SessionEvent, SessionPhase, TerminationReason};

/// Capacity of the event channel. A receiver that falls this far behind
/// sees `Lagged` and skips ahead.
const EVENT_CAPACITY: usize = 64;

/// What a single [`SessionChecker::reconcile`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Another reconciliation was already running; this one was dropped.
    Dropped,
    /// No session to check.
    Idle,
    /// A renewal or logout is in flight.
    Skipped,
    /// The prompt is showing; nothing re-evaluated.
    Suppressed,
    /// The access window is open.
    Valid,
    /// The window was open and close to its end; a keep-alive succeeded.
    Renewed,
    /// The window has closed but the modal gate held the prompt back.
    PromptDeferred,
    /// The countdown started and the prompt is now showing.
    PromptShown,
    /// The tick ended the session: a keep-alive failed, or the countdown
    /// ran out with no auto-terminate timer left to do it.
    Terminated,
    /// The tick hit an error or panicked and the session was terminated.
    FailedClosed,
}

// ---------------------------------------------------------------------------
// SessionChecker
// ---------------------------------------------------------------------------

struct CheckerInner<A> {
    store: SessionStore,
    clock: SharedClock,
    calculators: ExpiryCalculators,
    coordinator: RenewalCoordinator<A>,
    config: WardConfig,
    phase: Mutex<SessionPhase>,
    running: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

/// Drives the session through its phases.
///
/// Cheap to clone; all clones drive the same session.
pub struct SessionChecker<A> {
    inner: Arc<CheckerInner<A>>,
}

impl<A> Clone for SessionChecker<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: SessionActions> SessionChecker<A> {
    /// Builds a checker over `store`. `config` is validated first.
    pub fn new(
        store: SessionStore,
        clock: SharedClock,
        coordinator: RenewalCoordinator<A>,
        config: WardConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CheckerInner {
                calculators: ExpiryCalculators::new(store.clone(), Arc::clone(&clock)),
                store,
                clock,
                coordinator,
                config: config.validated(),
                phase: Mutex::new(SessionPhase::Terminated),
                running: AtomicBool::new(false),
                events,
            }),
        }
    }

    // -- Queries -----------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        *self.lock_phase()
    }

    /// A credential is held and the session has not been terminated.
    pub fn is_authenticated(&self) -> bool {
        self.phase().is_authenticated() && self.inner.store.access_token_present()
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn calculators(&self) -> &ExpiryCalculators {
        &self.inner.calculators
    }

    pub fn config(&self) -> &WardConfig {
        &self.inner.config
    }

    /// Subscribes to lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // -- Commands ----------------------------------------------------------

    /// Logs in with `credentials` and starts a new session.
    ///
    /// # Errors
    /// - [`CheckerError::Login`] if the backend refuses
    /// - [`CheckerError::Credential`] if the returned token is malformed;
    ///   the store is left untouched
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserInfo, CheckerError> {
        let grant = self.inner.coordinator.actions().login(credentials).await?;
        let token = grant.token()?;
        let window = grant.window_or(self.inner.config.access_window);
        let now = self.inner.clock.now();

        self.inner
            .store
            .seed(now, token, window, grant.user.clone());
        self.begin_episode(grant.user.clone());
        Ok(grant.user)
    }

    /// Restores a session silently (typically at startup), treating a
    /// successful renewal as a fresh login.
    ///
    /// A failure while signed out is simply reported; a failure while a
    /// session is live terminates it.
    pub async fn restore(&self) -> RenewalOutcome {
        let outcome = self
            .inner
            .coordinator
            .renew(RenewalKind::SilentRestoration)
            .await;

        match &outcome {
            RenewalOutcome::Success { user, .. } => self.begin_episode(user.clone()),
            RenewalOutcome::Failure(failure) => {
                if self.phase().is_authenticated() {
                    self.fail_renewal(failure).await;
                } else {
                    debug!(%failure, "silent restoration found no session");
                }
            }
        }
        outcome
    }

    /// The user answered the prompt with "continue".
    pub async fn continue_to_work(&self) -> RenewalOutcome {
        let outcome = self
            .inner
            .coordinator
            .renew(RenewalKind::ManualContinue)
            .await;

        match &outcome {
            RenewalOutcome::Success { kind, expiry, .. } => self.renewed(*kind, *expiry),
            RenewalOutcome::Failure(failure) => self.fail_renewal(failure).await,
        }
        outcome
    }

    /// Explicit logout. Works from any phase.
    pub async fn logout(&self) -> bool {
        self.terminate(TerminationReason::Logout).await
    }

    /// Ends the session for `reason`.
    ///
    /// Returns `false` (and does nothing) if the session was already
    /// terminated, which is what keeps the `Terminated` event unique. Also
    /// `false` if a sign-in replaced the session while the backend logout
    /// was running: the new session is kept and no event is sent.
    pub async fn terminate(&self, reason: TerminationReason) -> bool {
        let from = {
            let mut phase = self.lock_phase();
            if *phase == SessionPhase::Terminated {
                return false;
            }
            std::mem::replace(&mut *phase, SessionPhase::Terminated)
        };

        let user_id = self.inner.store.modify(|record| {
            record.cancel_auto_terminate();
            record.transition_kind = TransitionKind::Logout;
            record.user.as_ref().map(|user| user.id.clone())
        });

        if let Err(err) = self.inner.coordinator.actions().logout().await {
            warn!(%err, "backend logout failed, clearing local session anyway");
        }

        // A sign-in that landed during the logout call owns the record now.
        let wiped = self.inner.store.modify(|record| {
            if record.transition_kind != TransitionKind::Logout {
                return false;
            }
            record.cancel_auto_terminate();
            *record = SessionRecord::default();
            true
        });
        if !wiped {
            debug!(user_id = ?user_id, %reason, "sign-in during logout kept the new session");
            return false;
        }

        info!(user_id = ?user_id, %from, %reason, "session terminated");
        self.emit(SessionEvent::Terminated { reason });
        true
    }

    // -- Reconciliation ----------------------------------------------------

    /// Runs one reconciliation tick.
    ///
    /// Safe to call from anywhere at any rate: overlapping calls are
    /// dropped, and a failing tick terminates the session.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            debug!("reconciliation already running, dropping this one");
            return ReconcileOutcome::Dropped;
        }
        let _running = RunningGuard(&self.inner.running);

        let reason = match AssertUnwindSafe(self.reconcile_once()).catch_unwind().await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(err)) => {
                error!(%err, "reconciliation failed, terminating session");
                err.to_string()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(%message, "reconciliation panicked, terminating session");
                message
            }
        };

        self.terminate(TerminationReason::Internal(reason)).await;
        ReconcileOutcome::FailedClosed
    }

    async fn reconcile_once(&self) -> Result<ReconcileOutcome, CheckerError> {
        if self.phase() == SessionPhase::Terminated {
            return Ok(ReconcileOutcome::Idle);
        }

        let now = self.inner.clock.now();
        let snap = self.inner.store.snapshot();

        if !snap.access_token_present {
            return Err(CheckerError::InvariantViolated(
                "authenticated phase without a credential",
            ));
        }
        if snap.transition_kind.is_active() || snap.refresh_in_progress {
            debug!(transition = ?snap.transition_kind, "network call in flight, skipping");
            return Ok(ReconcileOutcome::Skipped);
        }
        if snap.modal_visible {
            if snap.renewal_countdown_expiry.is_none() {
                return Err(CheckerError::InvariantViolated(
                    "prompt visible without a countdown",
                ));
            }
            return Ok(self.countdown_tick(snap.auto_terminate_timer.is_some()).await);
        }

        if access_window_open(snap.access_window_expiry, now) {
            if snap.renewal_countdown_expiry.is_some() {
                return Err(CheckerError::InvariantViolated(
                    "countdown running while the access window is open",
                ));
            }
            self.advance(SessionPhase::Valid)?;

            let config = &self.inner.config;
            let calculators = &self.inner.calculators;
            let nearly_over = calculators
                .credential_remaining()
                .is_some_and(|left| left <= config.renewal_threshold);
            let active = !calculators.is_user_idle(config.idle_threshold);
            if config.proactive_renewal && nearly_over && active {
                return Ok(self.keep_alive().await);
            }
            return Ok(ReconcileOutcome::Valid);
        }

        if snap.renewal_countdown_expiry.is_some() {
            // The countdown is write-once; it only goes away through
            // renewal or logout.
            return Ok(self.countdown_tick(snap.auto_terminate_timer.is_some()).await);
        }

        self.advance(SessionPhase::AwaitingPrompt)?;
        self.open_prompt(now)
    }

    /// A tick while the countdown runs.
    ///
    /// The auto-terminate timer ends the session. If the countdown has run
    /// out and that timer is gone (discarded during an abandoned renewal),
    /// the tick ends it instead.
    async fn countdown_tick(&self, timer_armed: bool) -> ReconcileOutcome {
        let calculators = &self.inner.calculators;

        if !timer_armed && calculators.is_countdown_expired() {
            warn!("countdown ran out with no auto-terminate timer armed");
            return if self.terminate(TerminationReason::Inactivity).await {
                ReconcileOutcome::Terminated
            } else {
                ReconcileOutcome::Idle
            };
        }
        if calculators.countdown_needs_renewal(self.inner.config.renewal_threshold) {
            debug!(remaining = ?calculators.countdown_remaining(), "countdown nearly over");
        }
        ReconcileOutcome::Suppressed
    }

    /// Starts the countdown, shows the prompt and arms the auto-terminate
    /// timer, all under one store lock.
    fn open_prompt(&self, now: Timestamp) -> Result<ReconcileOutcome, CheckerError> {
        let config = &self.inner.config;

        let opened = self.inner.store.modify(|record| {
            if record.modal_visible || record.renewal_countdown_expiry.is_some() {
                return None;
            }
            if access_window_open(record.access_window_expiry, now) {
                return None;
            }
            let gate_open = record.last_modal_shown_at.is_none_or(|shown| {
                now.saturating_duration_since(shown) >= config.min_modal_gap
            });
            if !gate_open {
                return None;
            }

            let countdown_expiry = now + config.countdown_window;
            record.renewal_countdown_expiry = Some(countdown_expiry);
            record.modal_visible = true;
            record.last_modal_shown_at = Some(now);
            record.arm_auto_terminate(self.schedule_auto_terminate());
            Some(countdown_expiry)
        });

        let Some(countdown_expiry) = opened else {
            debug!(%now, "prompt held back by the modal gate");
            return Ok(ReconcileOutcome::PromptDeferred);
        };

        self.advance(SessionPhase::Prompting)?;
        info!(%now, %countdown_expiry, "renewal prompt shown");
        self.emit(SessionEvent::PromptShown { countdown_expiry });
        Ok(ReconcileOutcome::PromptShown)
    }

    async fn keep_alive(&self) -> ReconcileOutcome {
        match self.inner.coordinator.proactive_renew().await {
            RenewalOutcome::Success { kind, expiry, .. } => {
                self.renewed(kind, expiry);
                ReconcileOutcome::Renewed
            }
            RenewalOutcome::Failure(failure) => {
                self.fail_renewal(&failure).await;
                ReconcileOutcome::Terminated
            }
        }
    }

    // -- Auto-terminate timer ----------------------------------------------

    fn schedule_auto_terminate(&self) -> TimerHandle {
        let checker: Weak<CheckerInner<A>> = Arc::downgrade(&self.inner);
        schedule_once(self.inner.config.auto_terminate_delay, move |id| async move {
            if let Some(inner) = checker.upgrade() {
                SessionChecker { inner }.on_auto_terminate(id).await;
            }
        })
    }

    /// The auto-terminate timer `id` fired.
    ///
    /// Re-checks everything: the timer may have been replaced, a renewal
    /// may be in flight, or the prompt may already be gone.
    async fn on_auto_terminate(&self, id: TimerId) {
        let (ours, transition) = self.inner.store.modify(|record| {
            let ours = record.take_auto_terminate_if(id).is_some();
            (ours, record.transition_kind)
        });

        if !ours {
            debug!(%id, "stale auto-terminate timer ignored");
            return;
        }
        if transition.is_active() {
            debug!(%id, ?transition, "auto-terminate fired during a transition, ignored");
            return;
        }
        if self.phase() != SessionPhase::Prompting {
            debug!(%id, phase = %self.phase(), "auto-terminate fired outside the prompt, ignored");
            return;
        }

        self.terminate(TerminationReason::Inactivity).await;
    }

    // -- Helpers -----------------------------------------------------------

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, SessionPhase> {
        self.inner.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `to` along a valid edge.
    ///
    /// Returns `Ok(false)` without changing anything if already there, or
    /// if the session was terminated meanwhile (only a sign-in reopens
    /// it).
    fn advance(&self, to: SessionPhase) -> Result<bool, CheckerError> {
        let mut phase = self.lock_phase();
        let from = *phase;
        if from == to || from == SessionPhase::Terminated {
            return Ok(false);
        }
        if !from.can_transition_to(to) {
            return Err(CheckerError::InvalidTransition { from, to });
        }
        *phase = to;
        drop(phase);
        info!(%from, %to, "session phase changed");
        Ok(true)
    }

    fn begin_episode(&self, user: UserInfo) {
        let from = std::mem::replace(&mut *self.lock_phase(), SessionPhase::Valid);
        info!(user_id = %user.id, %from, "session started");
        self.emit(SessionEvent::SignedIn { user });
    }

    fn renewed(&self, kind: RenewalKind, expiry: Timestamp) {
        if let Err(err) = self.advance(SessionPhase::Valid) {
            warn!(%err, "renewal succeeded from an unexpected phase");
        }
        self.emit(SessionEvent::Renewed { kind, expiry });
    }

    async fn fail_renewal(&self, failure: &RenewalFailure) {
        match failure {
            // Someone else is already ending (or has ended) the session.
            RenewalFailure::Superseded | RenewalFailure::SignedOut => {
                debug!(%failure, "renewal result discarded");
            }
            _ => {
                self.terminate(TerminationReason::RenewalFailed(failure.to_string()))
                    .await;
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.inner.events.send(event);
    }
}

/// Clears the running flag when a reconciliation ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_owned()
    }
}
