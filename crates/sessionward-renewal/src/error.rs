//! Error types for the renewal layer.

use sessionward_types::CredentialError;

/// A [`SessionActions`](crate::SessionActions) call failed.
///
/// `Clone` because one failed refresh is reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The request never got a usable answer (offline, timeout, 5xx).
    #[error("network error: {0}")]
    Network(String),

    /// The backend refused: bad credentials, revoked refresh token, etc.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

/// Why a renewal did not produce a usable session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenewalFailure {
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The backend answered, but the token it sent fails the format check.
    #[error("renewal returned an unusable credential: {0}")]
    MalformedCredential(#[from] CredentialError),

    /// No credential is held, so there is nothing to renew. Only a silent
    /// restoration may start from a signed-out state.
    #[error("no session to renew")]
    SignedOut,

    /// A logout started before or during the renewal; its result was
    /// discarded.
    #[error("session ended while renewal was in flight")]
    Superseded,
}
