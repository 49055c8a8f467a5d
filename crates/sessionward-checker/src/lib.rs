//! The session lifecycle state machine for Sessionward.
//!
//! This crate decides, from the clock and the session store alone, when a
//! session is still usable, when to renew it quietly, when to prompt the
//! user, and when to end it:
//!
//! 1. **Phases** ([`SessionPhase`]) — `Valid → AwaitingPrompt → Prompting
//!    → Terminated`, with [`SessionEvent`]s broadcast on every edge that
//!    matters to the application.
//! 2. **The checker** ([`SessionChecker`]) — one reconciliation function,
//!    the auto-terminate timer, and the sign-in / continue / logout
//!    commands.
//! 3. **The loop** ([`ReconcileLoop`]) — poll ticks and activity pulses
//!    both funnel into the same reconciliation.
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)  ← public query/command surface
//!     ↕
//! Checker (this crate)  ← decides transitions
//!     ↕
//! Renewal + Store + Tick (below)
//! ```

mod checker;
mod driver;
mod error;
mod phase;

pub use checker::{ReconcileOutcome, SessionChecker};
pub use driver::ReconcileLoop;
pub use error::CheckerError;
pub use phase::{SessionEvent, SessionPhase, TerminationReason};
