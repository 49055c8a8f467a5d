//! `Sessionward` builder and public surface.
//!
//! This is the entry point for applications. It ties together all the
//! layers: activity → store → renewal → checker, and hands the
//! presentation layer a read-only [`DisplayState`].

use std::sync::{Arc, Mutex, PoisonError};

use sessionward_activity::{
    ActivityTracker, AlwaysFocused, FocusProbe, PulseOutcome, SignalHub, Subscription,
    TrackerConfig,
};
use sessionward_checker::{ReconcileLoop, SessionChecker, SessionEvent, SessionPhase};
use sessionward_renewal::{RenewalCoordinator, RenewalOutcome, SessionActions};
use sessionward_store::{SessionSnapshot, SessionStore};
use sessionward_tick::{PollConfig, PollScheduler};
use sessionward_types::{Credentials, Role, SharedClock, TokioClock, UserInfo, WardConfig};
use tokio::sync::{Notify, broadcast};

use crate::{DisplayState, SessionwardError};

/// Builder for configuring a [`Sessionward`].
///
/// # Example
///
/// ```rust,ignore
/// use sessionward::prelude::*;
///
/// let ward = SessionwardBuilder::new()
///     .config(WardConfig::from_json(r#"{ "access_window_ms": 60000 }"#)?)
///     .build(my_backend);
/// ward.start();
/// ward.login(&Credentials::new("kim", "hunter2")).await?;
/// ```
pub struct SessionwardBuilder {
    config: WardConfig,
    clock: Option<SharedClock>,
    focus: Option<Arc<dyn FocusProbe>>,
}

impl SessionwardBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WardConfig::default(),
            clock: None,
            focus: None,
        }
    }

    /// Sets the lifecycle configuration. It is validated on `build`.
    pub fn config(mut self, config: WardConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses and sets a JSON configuration.
    ///
    /// # Errors
    /// Returns [`SessionwardError::Config`] if the JSON is malformed.
    pub fn config_json(mut self, json: &str) -> Result<Self, SessionwardError> {
        self.config = WardConfig::from_json(json)?;
        Ok(self)
    }

    /// Replaces the clock. Defaults to a [`TokioClock`] anchored at the
    /// current wall time.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets how host focus is detected. Defaults to [`AlwaysFocused`].
    pub fn focus_probe(mut self, focus: Arc<dyn FocusProbe>) -> Self {
        self.focus = Some(focus);
        self
    }

    /// Wires every layer together over `actions`.
    ///
    /// Nothing runs until [`Sessionward::start`] is called.
    pub fn build<A: SessionActions>(self, actions: A) -> Sessionward<A> {
        let config = self.config.validated();
        let clock = self.clock.unwrap_or_else(|| Arc::new(TokioClock::new()));
        let focus = self.focus.unwrap_or_else(|| Arc::new(AlwaysFocused));

        let store = SessionStore::new();
        let coordinator = RenewalCoordinator::new(
            Arc::new(actions),
            store.clone(),
            Arc::clone(&clock),
            config.access_window,
        );
        let checker = SessionChecker::new(
            store.clone(),
            Arc::clone(&clock),
            coordinator,
            config.clone(),
        );

        let activity = Arc::new(Notify::new());
        let tracker = ActivityTracker::new(
            store.clone(),
            Arc::clone(&clock),
            TrackerConfig::from(&config),
            focus,
        );
        let trigger = Arc::clone(&activity);
        tracker.set_pulse_hook(Arc::new(move || trigger.notify_one()));

        let hub = Arc::new(SignalHub::new(Arc::clone(&clock)));

        tracing::debug!(?config, "sessionward built");

        Sessionward {
            config,
            clock,
            store,
            checker,
            tracker,
            hub,
            activity,
            running: Mutex::new(None),
        }
    }
}

impl Default for SessionwardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What `start()` brings up and `shutdown()` tears down.
struct Running {
    reconcile_loop: ReconcileLoop,
    _subscriptions: Vec<Subscription>,
}

/// The session lifecycle manager.
///
/// Application code signs in, feeds activity, and reacts to
/// [`SessionEvent`]s; a timer widget polls [`display_state`](Self::display_state).
pub struct Sessionward<A: SessionActions> {
    config: WardConfig,
    clock: SharedClock,
    store: SessionStore,
    checker: SessionChecker<A>,
    tracker: ActivityTracker,
    hub: Arc<SignalHub>,
    activity: Arc<Notify>,
    running: Mutex<Option<Running>>,
}

impl<A: SessionActions> Sessionward<A> {
    /// Creates a new builder.
    pub fn builder() -> SessionwardBuilder {
        SessionwardBuilder::new()
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Starts the reconciliation loop and subscribes the activity tracker
    /// to the signal hub. Must be called inside a Tokio runtime.
    ///
    /// Returns `false` if already started.
    pub fn start(&self) -> bool {
        let mut running = self.lock_running();
        if running.is_some() {
            return false;
        }

        let poll = PollScheduler::new(PollConfig {
            interval: self.config.poll_interval,
            initial_jitter: self.config.poll_jitter,
        });
        let reconcile_loop = self.checker.spawn_loop(poll, Arc::clone(&self.activity));
        let subscriptions = self.tracker.attach(self.hub.as_ref());

        *running = Some(Running {
            reconcile_loop,
            _subscriptions: subscriptions,
        });
        tracing::info!("sessionward started");
        true
    }

    /// Stops the loop and unsubscribes from the hub. The session itself is
    /// left as it is. Idempotent.
    pub async fn shutdown(&self) {
        let running = self.lock_running().take();
        if let Some(mut running) = running {
            running.reconcile_loop.shutdown().await;
            tracing::info!("sessionward stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|running| running.reconcile_loop.is_running())
    }

    // -- Commands ----------------------------------------------------------

    /// Signs in and starts a new session.
    ///
    /// # Errors
    /// [`SessionwardError::Checker`] if the backend refuses or returns an
    /// unusable token. The session state is unchanged in that case.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserInfo, SessionwardError> {
        Ok(self.checker.sign_in(credentials).await?)
    }

    /// Tries to restore a session without user involvement, e.g. at
    /// startup from a refresh cookie the backend holds.
    ///
    /// # Errors
    /// [`SessionwardError::Renewal`] if there is nothing to restore.
    pub async fn restore(&self) -> Result<UserInfo, SessionwardError> {
        into_user(self.checker.restore().await)
    }

    /// Feeds one unit of activity, bypassing the signal filters.
    pub fn notify_activity(&self) -> PulseOutcome {
        self.tracker.pulse()
    }

    /// The user clicked "continue" on the expiry prompt.
    ///
    /// # Errors
    /// [`SessionwardError::Renewal`] if the renewal failed. The session has
    /// already been terminated by then (unless a logout got there first).
    pub async fn request_continue_to_work(&self) -> Result<UserInfo, SessionwardError> {
        into_user(self.checker.continue_to_work().await)
    }

    /// Logs out. Returns `false` if there was no session to end.
    pub async fn request_logout(&self) -> bool {
        self.checker.logout().await
    }

    // -- Queries -----------------------------------------------------------

    pub fn is_authenticated(&self) -> bool {
        self.checker.is_authenticated()
    }

    pub fn phase(&self) -> SessionPhase {
        self.checker.phase()
    }

    pub fn display_state(&self) -> DisplayState {
        let phase = self.checker.phase();
        let snapshot = self.store.snapshot();
        DisplayState::derive(phase, &snapshot, self.clock.now(), &self.config)
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        if !self.is_authenticated() {
            return None;
        }
        self.store.user()
    }

    /// Whether the signed-in user holds `role`. Always `false` when signed
    /// out.
    pub fn has_role(&self, role: &Role) -> bool {
        self.current_user().is_some_and(|user| user.has_role(role))
    }

    /// A copy of the raw session record, for debugging panels and logs.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    pub fn config(&self) -> &WardConfig {
        &self.config
    }

    /// Lifecycle events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.checker.subscribe()
    }

    /// Where the host feeds raw interaction signals.
    pub fn signal_hub(&self) -> &Arc<SignalHub> {
        &self.hub
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn into_user(outcome: RenewalOutcome) -> Result<UserInfo, SessionwardError> {
    match outcome {
        RenewalOutcome::Success { user, .. } => Ok(user),
        RenewalOutcome::Failure(failure) => Err(failure.into()),
    }
}
