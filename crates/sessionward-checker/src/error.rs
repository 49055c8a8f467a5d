//! Error types for the checker layer.

use sessionward_renewal::ActionError;
use sessionward_types::CredentialError;

use crate::SessionPhase;

/// Errors that can occur while driving the session lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    /// The backend refused the login.
    #[error("login failed: {0}")]
    Login(#[from] ActionError),

    /// The login succeeded but returned a token that fails the format check.
    #[error("login returned an unusable credential: {0}")]
    Credential(#[from] CredentialError),

    /// The session record contradicts itself. Reconciliation fails closed
    /// on this.
    #[error("session invariant violated: {0}")]
    InvariantViolated(&'static str),

    /// The state machine was asked to move along an edge it doesn't have.
    #[error("invalid phase transition {from} -> {to}")]
    InvalidTransition {
        from: SessionPhase,
        to: SessionPhase,
    },
}
