//! Session phases, termination reasons, and the events the checker emits.

use std::fmt;

use serde::{Deserialize, Serialize};
use sessionward_types::{RenewalKind, Timestamp, UserInfo};

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///              sign-in / restore
/// Terminated ─────────────────────→ Valid ←──────────────┐
///     ↑                               │                  │ renewal
///     │                     window closed                │ success
///     │                               ▼                  │
///     ├──────────────────────── AwaitingPrompt ──────────┤
///     │                               │                  │
///     │                     modal gate open              │
///     │                               ▼                  │
///     └──────────────────────── Prompting ───────────────┘
///       timer / renewal failure
///       / logout / internal error
/// ```
///
/// - **Valid**: the access window is open.
/// - **AwaitingPrompt**: the window has closed but the prompt has not been
///   shown yet. Normally a single reconciliation tick wide; it only lasts
///   longer while the modal gate holds the prompt back.
/// - **Prompting**: the renewal countdown is running and the prompt is up.
/// - **Terminated**: logged out. Only a new sign-in leaves this phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    Valid,
    AwaitingPrompt,
    Prompting,
    #[default]
    Terminated,
}

impl SessionPhase {
    /// Returns `true` for every phase in which a credential is held.
    pub fn is_authenticated(self) -> bool {
        !matches!(self, Self::Terminated)
    }

    /// Returns `true` if moving from `self` to `target` is allowed.
    ///
    /// Staying in the same phase is not a transition and returns `false`.
    pub fn can_transition_to(self, target: Self) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (Valid, AwaitingPrompt)
                | (Valid, Terminated)
                | (AwaitingPrompt, Prompting)
                | (AwaitingPrompt, Valid)
                | (AwaitingPrompt, Terminated)
                | (Prompting, Valid)
                | (Prompting, Terminated)
                | (Terminated, Valid)
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "Valid"),
            Self::AwaitingPrompt => write!(f, "AwaitingPrompt"),
            Self::Prompting => write!(f, "Prompting"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

// ---------------------------------------------------------------------------
// TerminationReason
// ---------------------------------------------------------------------------

/// Why a session ended. Carried by [`SessionEvent::Terminated`] so the
/// application can show the right message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The prompt went unanswered until the auto-terminate timer fired.
    Inactivity,
    /// The user (or the application) asked to log out.
    Logout,
    /// A renewal failed; the message describes why.
    RenewalFailed(String),
    /// Reconciliation hit an unexpected error or panicked.
    Internal(String),
}

impl TerminationReason {
    /// The user-facing message for this reason.
    pub fn message(&self) -> &str {
        match self {
            Self::Inactivity => "Your session expired due to inactivity.",
            Self::Logout => "You have been logged out.",
            Self::RenewalFailed(_) => "Your session could not be renewed. Please sign in again.",
            Self::Internal(_) => "Your session ended unexpectedly. Please sign in again.",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactivity => write!(f, "inactivity"),
            Self::Logout => write!(f, "logout"),
            Self::RenewalFailed(why) => write!(f, "renewal failed: {why}"),
            Self::Internal(why) => write!(f, "internal error: {why}"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Notifications broadcast by the checker.
///
/// Exactly one `Terminated` is sent per session, however many paths
/// notice the end at the same time.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn { user: UserInfo },
    PromptShown { countdown_expiry: Timestamp },
    Renewed { kind: RenewalKind, expiry: Timestamp },
    Terminated { reason: TerminationReason },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_default_is_terminated() {
        assert_eq!(SessionPhase::default(), SessionPhase::Terminated);
        assert!(!SessionPhase::default().is_authenticated());
    }

    #[test]
    fn test_phase_prompting_cannot_be_reentered_without_valid() {
        assert!(!SessionPhase::Prompting.can_transition_to(SessionPhase::AwaitingPrompt));
        assert!(!SessionPhase::Prompting.can_transition_to(SessionPhase::Prompting));
        assert!(SessionPhase::Prompting.can_transition_to(SessionPhase::Valid));
    }

    #[test]
    fn test_phase_valid_cannot_skip_awaiting_prompt() {
        assert!(!SessionPhase::Valid.can_transition_to(SessionPhase::Prompting));
        assert!(SessionPhase::Valid.can_transition_to(SessionPhase::AwaitingPrompt));
    }

    #[test]
    fn test_phase_terminated_only_reopens_to_valid() {
        let from = SessionPhase::Terminated;
        assert!(from.can_transition_to(SessionPhase::Valid));
        assert!(!from.can_transition_to(SessionPhase::AwaitingPrompt));
        assert!(!from.can_transition_to(SessionPhase::Prompting));
    }

    #[test]
    fn test_every_live_phase_can_terminate() {
        for phase in [
            SessionPhase::Valid,
            SessionPhase::AwaitingPrompt,
            SessionPhase::Prompting,
        ] {
            assert!(phase.can_transition_to(SessionPhase::Terminated), "{phase}");
        }
    }

    #[test]
    fn test_termination_reason_messages_differ() {
        let inactivity = TerminationReason::Inactivity.message();
        let logout = TerminationReason::Logout.message();
        let failed_reason = TerminationReason::RenewalFailed("x".into());
        let failed = failed_reason.message();
        assert_ne!(inactivity, logout);
        assert_ne!(logout, failed);
    }
}
