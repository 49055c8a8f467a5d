//! The session record: every field the lifecycle state machine tracks.
//!
//! A record starts empty, is seeded on login, mutated continuously by
//! activity and reconciliation, replaced on renewal, and wiped on logout.

use std::time::Duration;

use sessionward_tick::{TimerHandle, TimerId};
use sessionward_types::{AccessToken, Timestamp, TransitionKind, UserInfo};

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// The live session record.
///
/// Only reachable through [`SessionStore`](crate::SessionStore), either one
/// field at a time or inside [`SessionStore::modify`](crate::SessionStore::modify).
/// The auto-terminate timer is private so that replacing it always cancels
/// the previous one.
#[derive(Debug, Default)]
pub struct SessionRecord {
    pub access_token: Option<AccessToken>,

    /// Length of the access window in effect for this session. Activity
    /// pulses slide the expiry forward by this much.
    pub access_window: Option<Duration>,

    /// When the access window closes unless activity extends it.
    pub access_window_expiry: Option<Timestamp>,

    /// When the credential itself runs out. Set on seed and on renewal,
    /// never moved by activity; proactive renewal watches this.
    pub credential_expiry: Option<Timestamp>,

    pub last_activity_at: Option<Timestamp>,

    /// Set only once the access window has closed. `None` = no countdown.
    pub renewal_countdown_expiry: Option<Timestamp>,

    pub transition_kind: TransitionKind,

    pub modal_visible: bool,
    pub last_modal_shown_at: Option<Timestamp>,

    pub refresh_in_progress: bool,

    pub user: Option<UserInfo>,

    auto_terminate: Option<TimerHandle>,
}

impl SessionRecord {
    pub fn access_token_present(&self) -> bool {
        self.access_token.is_some()
    }

    /// Id of the armed auto-terminate timer, if any.
    pub fn auto_terminate_timer(&self) -> Option<TimerId> {
        self.auto_terminate.as_ref().map(TimerHandle::id)
    }

    /// Arms `handle` as the auto-terminate timer, cancelling whatever was
    /// armed before. At most one timer is ever live.
    pub fn arm_auto_terminate(&mut self, handle: TimerHandle) {
        if let Some(previous) = self.auto_terminate.replace(handle) {
            previous.cancel();
        }
    }

    /// Cancels and forgets the armed timer. Returns `true` if there was one.
    pub fn cancel_auto_terminate(&mut self) -> bool {
        match self.auto_terminate.take() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes the armed timer *without* cancelling it, but only if it is
    /// the timer identified by `id`.
    ///
    /// A firing timer calls this on itself: cancelling would abort the very
    /// task doing the work, and a mismatched id means the callback is stale.
    pub fn take_auto_terminate_if(&mut self, id: TimerId) -> Option<TimerHandle> {
        if self.auto_terminate_timer() == Some(id) {
            self.auto_terminate.take()
        } else {
            None
        }
    }

    /// Copies every field out (the timer reduced to its id).
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            access_token_present: self.access_token_present(),
            access_window: self.access_window,
            access_window_expiry: self.access_window_expiry,
            credential_expiry: self.credential_expiry,
            last_activity_at: self.last_activity_at,
            renewal_countdown_expiry: self.renewal_countdown_expiry,
            transition_kind: self.transition_kind,
            modal_visible: self.modal_visible,
            last_modal_shown_at: self.last_modal_shown_at,
            auto_terminate_timer: self.auto_terminate_timer(),
            refresh_in_progress: self.refresh_in_progress,
            user: self.user.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of a [`SessionRecord`], safe to hold onto, log, and
/// compare in tests.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub access_token_present: bool,
    pub access_window: Option<Duration>,
    pub access_window_expiry: Option<Timestamp>,
    pub credential_expiry: Option<Timestamp>,
    pub last_activity_at: Option<Timestamp>,
    pub renewal_countdown_expiry: Option<Timestamp>,
    pub transition_kind: TransitionKind,
    pub modal_visible: bool,
    pub last_modal_shown_at: Option<Timestamp>,
    pub auto_terminate_timer: Option<TimerId>,
    pub refresh_in_progress: bool,
    pub user: Option<UserInfo>,
}

impl SessionSnapshot {
    /// `true` if nothing is set, the state after `clear_all()`.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
