//! Session renewal for Sessionward.
//!
//! 1. **The network boundary** — [`SessionActions`]: login, refresh and
//!    logout, implemented by the application against whatever backend it
//!    talks to.
//! 2. **Deduplication** — [`SingleFlight`]: a keyed in-flight map that
//!    hands late callers the future already on the wire.
//! 3. **The coordinator** — [`RenewalCoordinator`]: runs one refresh at a
//!    time and applies its result to the session store consistently.
//!
//! # How it fits in the stack
//!
//! ```text
//! Checker (above)  ← decides *when* to renew, reacts to Failure
//!     ↕
//! Renewal (this crate)  ← performs the renewal, applies Success
//!     ↕
//! Store + Types (below)
//! ```

mod actions;
mod coordinator;
mod error;
mod single_flight;

pub use actions::SessionActions;
pub use coordinator::{RenewalCoordinator, RenewalOutcome};
pub use error::{ActionError, RenewalFailure};
pub use single_flight::SingleFlight;
