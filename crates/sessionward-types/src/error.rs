//! Error types for the shared vocabulary.
//!
//! Like every crate in the workspace, this one owns its own error enums.
//! A `CredentialError` always means "the bytes we were handed do not look
//! like a credential", never "the credential is untrusted": trust is the
//! network layer's job.

/// A credential failed the local format check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The token string was empty (or only whitespace).
    #[error("access token is empty")]
    Empty,

    /// The token is not in compact `header.payload.signature` form.
    #[error("malformed access token: {0}")]
    Malformed(String),
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document was malformed or had fields of the wrong type.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}
