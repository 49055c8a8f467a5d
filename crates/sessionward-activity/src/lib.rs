//! Activity tracking for Sessionward.
//!
//! Turns a stream of raw interaction signals into throttled "activity
//! pulses" that slide the access window forward.
//!
//! - [`SignalSource`] — the abstract subscription interface
//!   (`subscribe(category, throttle) -> Subscription`). Hosts feed signals
//!   in through the provided [`SignalHub`].
//! - [`Throttled`] — the rate-limiting decorator the hub applies to any
//!   subscription that asks for one.
//! - [`FocusProbe`] — whether the host application currently has focus.
//! - [`ActivityTracker`] — subscribes to every category and applies the
//!   pulse rule to the session store.
//!
//! ```text
//! host events → SignalHub → (Throttled) → ActivityTracker::handle_signal
//!                                           → SessionStore (window slides)
//!                                           → pulse hook (checker trigger)
//! ```

mod focus;
mod signal;
mod source;
mod tracker;

pub use focus::{AlwaysFocused, FocusFlag, FocusProbe};
pub use signal::{Signal, SignalCategory};
pub use source::{SignalHandler, SignalHub, SignalSource, Subscription, Throttled};
pub use tracker::{ActivityTracker, PulseHook, PulseOutcome, TrackerConfig};
