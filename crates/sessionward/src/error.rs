//! Unified error type for Sessionward.

use sessionward_checker::CheckerError;
use sessionward_renewal::RenewalFailure;
use sessionward_types::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `sessionward` facade you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum SessionwardError {
    /// The configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sign-in failed or the lifecycle hit an invalid state.
    #[error(transparent)]
    Checker(#[from] CheckerError),

    /// A renewal (restore or continue) did not produce a session.
    #[error(transparent)]
    Renewal(#[from] RenewalFailure),
}
