//! The network boundary.
//!
//! Sessionward doesn't talk to a backend itself. The application
//! implements [`SessionActions`] with its own transport (REST, GraphQL,
//! an SDK...) and Sessionward only looks at whether each call succeeded.
//!
//! # Why a trait?
//!
//! The state machine never needs to know how a refresh is performed, only
//! what came back. A trait keeps the real HTTP client, a canned demo
//! backend, and a scripted test double interchangeable without touching
//! the coordinator.

use std::future::Future;

use sessionward_types::{AccessGrant, Credentials, RenewalKind};

use crate::ActionError;

/// Login, refresh and logout against the application's backend.
///
/// # Trait bounds
///
/// - `Send + Sync` → shared between the reconciliation task, timer
///   callbacks and application code.
/// - `'static` → held for as long as the session manager lives.
///
/// # Example
///
/// ```rust
/// use sessionward_renewal::{ActionError, SessionActions};
/// use sessionward_types::{AccessGrant, Credentials, RenewalKind, Role, UserId, UserInfo};
///
/// /// Accepts one hard-coded user. Only for demos!
/// struct DemoBackend;
///
/// impl SessionActions for DemoBackend {
///     async fn login(&self, credentials: &Credentials) -> Result<AccessGrant, ActionError> {
///         if credentials.password != "open-sesame" {
///             return Err(ActionError::Rejected("bad password".into()));
///         }
///         self.refresh(RenewalKind::SilentRestoration).await
///     }
///
///     async fn refresh(&self, _kind: RenewalKind) -> Result<AccessGrant, ActionError> {
///         Ok(AccessGrant {
///             access_token: "eyJh.eyJz.c2ln".into(),
///             access_window: None,
///             user: UserInfo {
///                 id: UserId("demo".into()),
///                 role: Role::Member,
///                 email: "demo@example.com".into(),
///             },
///         })
///     }
///
///     async fn logout(&self) -> Result<(), ActionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait SessionActions: Send + Sync + 'static {
    /// Exchanges credentials for a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AccessGrant, ActionError>> + Send;

    /// Renews the current session. `kind` tells the backend why.
    fn refresh(
        &self,
        kind: RenewalKind,
    ) -> impl Future<Output = Result<AccessGrant, ActionError>> + Send;

    /// Ends the session server-side. Best effort: local state is wiped
    /// whatever this returns.
    fn logout(&self) -> impl Future<Output = Result<(), ActionError>> + Send;
}
