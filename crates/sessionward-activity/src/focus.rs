//! Host focus probing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the host application currently has focus.
pub trait FocusProbe: Send + Sync + 'static {
    fn is_focused(&self) -> bool;

    /// Called by the tracker when it sees a focus or blur signal. Probes
    /// that track focus themselves can ignore it.
    fn focus_changed(&self, _focused: bool) {}
}

/// A probe for hosts with no notion of focus.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFocused;

impl FocusProbe for AlwaysFocused {
    fn is_focused(&self) -> bool {
        true
    }
}

/// A settable focus flag, updated from focus/blur signals or directly by
/// the host. Starts focused.
#[derive(Debug, Clone)]
pub struct FocusFlag(Arc<AtomicBool>);

impl FocusFlag {
    pub fn new(focused: bool) -> Self {
        Self(Arc::new(AtomicBool::new(focused)))
    }

    pub fn set(&self, focused: bool) {
        self.0.store(focused, Ordering::SeqCst);
    }
}

impl Default for FocusFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FocusProbe for FocusFlag {
    fn is_focused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn focus_changed(&self, focused: bool) {
        self.set(focused);
    }
}
