//! Shared vocabulary for Sessionward.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - **Time** ([`Timestamp`], [`Clock`], [`TokioClock`], [`ManualClock`]) —
//!   all expiry arithmetic is done on injected clocks, never on ambient
//!   `SystemTime::now()` calls, so tests can drive time deterministically.
//! - **Identity** ([`UserInfo`], [`UserId`], [`Role`]) — who is signed in.
//! - **Credentials** ([`AccessToken`], [`Credentials`], [`AccessGrant`]) —
//!   what the network layer hands back, and the format check applied to it.
//! - **Markers** ([`RenewalKind`], [`TransitionKind`]) — why a renewal is
//!   happening and what network call is currently in flight.
//! - **Configuration** ([`WardConfig`]) — every duration the state machine
//!   uses.
//!
//! # Architecture
//!
//! ```text
//! Facade (sessionward) → Checker → Renewal / Activity → Store → Tick
//!                                  ↘        ↓         ↙
//!                                  Types (this crate)
//! ```

mod clock;
mod config;
mod credentials;
mod error;
mod types;

pub use clock::{Clock, ManualClock, SharedClock, TokioClock};
pub use config::WardConfig;
pub use credentials::{AccessGrant, AccessToken, Credentials};
pub use error::{ConfigError, CredentialError};
pub use types::{RenewalKind, Role, Timestamp, TransitionKind, UserId, UserInfo};
