//! Core value types: timestamps, identity, and in-flight markers.

use std::fmt;
use std::ops::Add;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// A point in time, in milliseconds since the Unix epoch.
///
/// Every expiry the state machine stores (`access_window_expiry`,
/// `renewal_countdown_expiry`, ...) is a `Timestamp`. Millisecond
/// resolution is plenty for windows measured in seconds to minutes,
/// and a plain `u64` keeps comparisons and serialization trivial.
///
/// Timestamps are produced by a [`Clock`](crate::Clock), never by reading
/// the system time directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Creates a timestamp from raw milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp `secs` seconds after the epoch.
    /// Mostly useful in tests, where scenarios are written in seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000)
    }

    /// Returns the raw millisecond value.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// How long after `earlier` this timestamp is. Zero if `earlier` is
    /// actually later.
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// How long until `later` is reached. Zero if it has already passed.
    pub fn duration_until(self, later: Timestamp) -> Duration {
        later.saturating_duration_since(self)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}s", self.0 / 1_000, self.0 % 1_000)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque user identifier as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role a user holds. Cached so application code can gate features
/// without another network round trip.
///
/// Unknown roles are kept verbatim in [`Role::Other`] rather than rejected;
/// the backend is the authority on which roles exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Member,
    Viewer,
    Other(String),
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "member" => Self::Member,
            "viewer" => Self::Viewer,
            _ => Self::Other(raw),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Member => f.write_str("member"),
            Self::Viewer => f.write_str("viewer"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// The signed-in user, as reported by login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub role: Role,
    pub email: String,
}

impl UserInfo {
    /// Returns `true` if the user holds `role`. Admins hold every role.
    pub fn has_role(&self, role: &Role) -> bool {
        self.role == Role::Admin || &self.role == role
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Why a renewal is being requested.
///
/// The backend receives this so it can tell the three apart in its own
/// logs and rate limits; locally it decides which fields of the session
/// record are reset on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenewalKind {
    /// Restoring a session without user involvement (startup, or a
    /// renewal the user never saw). Success is treated as a fresh login.
    SilentRestoration,
    /// The user clicked "continue" on the expiry prompt.
    ManualContinue,
    /// Proactive refresh while the user is active and the access window is
    /// nearly over.
    KeepAlive,
}

impl fmt::Display for RenewalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SilentRestoration => f.write_str("silent-restoration"),
            Self::ManualContinue => f.write_str("manual-continue"),
            Self::KeepAlive => f.write_str("keep-alive"),
        }
    }
}

/// Marks that a renewal or logout network call is in flight.
///
/// While this is anything but `None`, reconciliation steps aside and a
/// firing auto-terminate timer is ignored: the in-flight call decides
/// what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransitionKind {
    #[default]
    None,
    ContinueToWork,
    Logout,
}

impl TransitionKind {
    /// Returns `true` if a network transition is in flight.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}
