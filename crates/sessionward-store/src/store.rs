//! The session store: shared, atomic access to the one session record.
//!
//! # Concurrency note
//!
//! The store is a `std::sync::Mutex` behind an `Arc`, not an async mutex.
//! Every operation is a handful of field reads and writes, the lock is
//! never held across an `.await`, and callers from timer callbacks,
//! activity signals and network completions all need synchronous access.
//! A poisoned lock is recovered rather than propagated: each write is a
//! single assignment, so a panic elsewhere cannot leave a field half-set.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sessionward_tick::{TimerHandle, TimerId};
use sessionward_types::{AccessToken, Timestamp, TransitionKind, UserInfo};

use crate::{SessionRecord, SessionSnapshot};

/// Handle to the session record.
///
/// Cloning is cheap and every clone sees the same record. The store is
/// created empty; nothing survives a process restart.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the record.
    ///
    /// This is how callers do read-compare-write without another writer
    /// slipping in between. Keep `f` short and synchronous.
    pub fn modify<R>(&self, f: impl FnOnce(&mut SessionRecord) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Seeds the record after a successful login or restoration.
    ///
    /// The access window opens at `now`, counts as activity, and every
    /// prompt-related field is reset. Any armed timer is cancelled.
    pub fn seed(&self, now: Timestamp, token: AccessToken, window: Duration, user: UserInfo) {
        let mut record = self.lock();
        record.cancel_auto_terminate();
        *record = SessionRecord::default();
        record.access_token = Some(token);
        record.access_window = Some(window);
        record.access_window_expiry = Some(now + window);
        record.credential_expiry = Some(now + window);
        record.last_activity_at = Some(now);
        record.user = Some(user);
        tracing::debug!(%now, expires = %(now + window), "session record seeded");
    }

    /// Wipes every field and cancels any armed timer.
    ///
    /// Idempotent and safe in any state.
    pub fn clear_all(&self) {
        let mut record = self.lock();
        record.cancel_auto_terminate();
        *record = SessionRecord::default();
    }

    // -- Credential --------------------------------------------------------

    pub fn access_token_present(&self) -> bool {
        self.lock().access_token_present()
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.lock().access_token.clone()
    }

    pub fn set_access_token(&self, token: Option<AccessToken>) {
        self.lock().access_token = token;
    }

    pub fn access_window(&self) -> Option<Duration> {
        self.lock().access_window
    }

    pub fn set_access_window(&self, window: Option<Duration>) {
        self.lock().access_window = window;
    }

    // -- Expiries ----------------------------------------------------------

    pub fn access_window_expiry(&self) -> Option<Timestamp> {
        self.lock().access_window_expiry
    }

    pub fn set_access_window_expiry(&self, expiry: Option<Timestamp>) {
        self.lock().access_window_expiry = expiry;
    }

    pub fn credential_expiry(&self) -> Option<Timestamp> {
        self.lock().credential_expiry
    }

    pub fn set_credential_expiry(&self, expiry: Option<Timestamp>) {
        self.lock().credential_expiry = expiry;
    }

    pub fn last_activity_at(&self) -> Option<Timestamp> {
        self.lock().last_activity_at
    }

    pub fn set_last_activity_at(&self, at: Option<Timestamp>) {
        self.lock().last_activity_at = at;
    }

    pub fn renewal_countdown_expiry(&self) -> Option<Timestamp> {
        self.lock().renewal_countdown_expiry
    }

    pub fn set_renewal_countdown_expiry(&self, expiry: Option<Timestamp>) {
        self.lock().renewal_countdown_expiry = expiry;
    }

    // -- Prompt ------------------------------------------------------------

    pub fn transition_kind(&self) -> TransitionKind {
        self.lock().transition_kind
    }

    pub fn set_transition_kind(&self, kind: TransitionKind) {
        self.lock().transition_kind = kind;
    }

    pub fn modal_visible(&self) -> bool {
        self.lock().modal_visible
    }

    pub fn set_modal_visible(&self, visible: bool) {
        self.lock().modal_visible = visible;
    }

    pub fn last_modal_shown_at(&self) -> Option<Timestamp> {
        self.lock().last_modal_shown_at
    }

    pub fn set_last_modal_shown_at(&self, at: Option<Timestamp>) {
        self.lock().last_modal_shown_at = at;
    }

    // -- Renewal -----------------------------------------------------------

    pub fn refresh_in_progress(&self) -> bool {
        self.lock().refresh_in_progress
    }

    pub fn set_refresh_in_progress(&self, in_progress: bool) {
        self.lock().refresh_in_progress = in_progress;
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.lock().user.clone()
    }

    pub fn set_user(&self, user: Option<UserInfo>) {
        self.lock().user = user;
    }

    // -- Auto-terminate timer ----------------------------------------------

    pub fn auto_terminate_timer(&self) -> Option<TimerId> {
        self.lock().auto_terminate_timer()
    }

    /// See [`SessionRecord::arm_auto_terminate`].
    pub fn arm_auto_terminate(&self, handle: TimerHandle) {
        self.lock().arm_auto_terminate(handle);
    }

    /// See [`SessionRecord::cancel_auto_terminate`].
    pub fn cancel_auto_terminate(&self) -> bool {
        self.lock().cancel_auto_terminate()
    }

    /// See [`SessionRecord::take_auto_terminate_if`].
    pub fn take_auto_terminate_if(&self, id: TimerId) -> Option<TimerHandle> {
        self.lock().take_auto_terminate_if(id)
    }
}

// =========================================================================
// Tests
// =========================================================================
