//! Session state for Sessionward.
//!
//! This crate owns the one piece of mutable state the whole system shares:
//!
//! 1. **The record** ([`SessionRecord`]) — access window, countdown, prompt
//!    visibility, in-flight markers, the cached user.
//! 2. **The store** ([`SessionStore`]) — a cheap-to-clone handle that gives
//!    every other component atomic get/set access to the record.
//! 3. **The calculators** ([`ExpiryCalculators`]) — side-effect-free
//!    answers to "is the window open?" and "has the countdown run out?".
//!
//! # How it fits in the stack
//!
//! ```text
//! Checker / Renewal / Activity (above)  ← read and write through the store
//!     ↕
//! Store (this crate)  ← one record, no persistence
//!     ↕
//! Types + Tick (below)  ← Timestamp, AccessToken, TimerHandle
//! ```
//!
//! The store enforces no invariants on its own: callers read the current
//! value, compare it against the clock, and only then write. The
//! [`SessionStore::modify`] closure exists so that read-compare-write can
//! happen under one lock.

mod expiry;
mod record;
mod store;

pub use expiry::{
    ExpiryCalculators, access_window_open, countdown_expired, remaining_until, user_idle,
};
pub use record::{SessionRecord, SessionSnapshot};
pub use store::SessionStore;
