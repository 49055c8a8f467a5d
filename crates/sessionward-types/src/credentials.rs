//! Credentials and the grants the network layer returns for them.
//!
//! Sessionward never verifies signatures. The only check made locally is a
//! *format* check on the access token: anything that isn't shaped like a
//! compact JWT (`header.payload.signature`, base64url segments) is treated
//! as "not signed in". Whether the token is genuine is decided by the
//! server that issued it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CredentialError, UserInfo};

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// An access token that passed the format check.
///
/// The only way to build one is [`AccessToken::parse`], so holding an
/// `AccessToken` means the format is known to be sane.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Validates the compact `a.b.c` shape of `raw`.
    ///
    /// # Errors
    /// - [`CredentialError::Empty`] — nothing (or only whitespace) was given
    /// - [`CredentialError::Malformed`] — wrong segment count, an empty
    ///   segment, or a character outside the base64url alphabet
    pub fn parse(raw: impl Into<String>) -> Result<Self, CredentialError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CredentialError::Empty);
        }

        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(CredentialError::Malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(CredentialError::Malformed(format!(
                    "segment {index} is empty"
                )));
            }
            if let Some(bad) = segment.chars().find(|c| !is_base64url(*c)) {
                return Err(CredentialError::Malformed(format!(
                    "segment {index} contains {bad:?}"
                )));
            }
        }

        Ok(Self(raw))
    }

    /// The raw token, for attaching to outgoing requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tokens end up in logs through `{:?}` more often than anyone intends.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

fn is_base64url(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// What the user types into the login form.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AccessGrant
// ---------------------------------------------------------------------------

/// The success payload of a login or refresh call.
///
/// `access_token` is the raw string exactly as the backend sent it; call
/// [`AccessGrant::token`] to run the format check. `access_window` lets the
/// backend dictate the window length; `None` means "use the configured
/// one".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub access_token: String,
    #[serde(default)]
    pub access_window: Option<Duration>,
    pub user: UserInfo,
}

impl AccessGrant {
    /// Format-checks the token carried by this grant.
    ///
    /// # Errors
    /// Propagates [`AccessToken::parse`] failures.
    pub fn token(&self) -> Result<AccessToken, CredentialError> {
        AccessToken::parse(self.access_token.clone())
    }

    /// The window this grant opens: the backend's if it sent one,
    /// otherwise `fallback`. A zero-length window from the backend is
    /// ignored, since it would expire the session the moment it starts.
    pub fn window_or(&self, fallback: Duration) -> Duration {
        match self.access_window {
            Some(window) if !window.is_zero() => window,
            _ => fallback,
        }
    }
}
