//! Interaction signal types.

use std::fmt;

/// The broad kinds of user interaction that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalCategory {
    PointerDown,
    PointerMove,
    Key,
    Touch,
    Scroll,
    Wheel,
    Focus,
    Blur,
    Input,
    Navigation,
}

impl SignalCategory {
    /// Every category, in a stable order.
    pub const ALL: [SignalCategory; 10] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::Key,
        Self::Touch,
        Self::Scroll,
        Self::Wheel,
        Self::Focus,
        Self::Blur,
        Self::Input,
        Self::Navigation,
    ];

    /// Categories that can fire dozens of times per second and therefore
    /// get throttled. Everything else pulses immediately.
    pub fn is_high_frequency(self) -> bool {
        matches!(self, Self::PointerMove | Self::Scroll | Self::Wheel)
    }
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PointerDown => "pointer-down",
            Self::PointerMove => "pointer-move",
            Self::Key => "key",
            Self::Touch => "touch",
            Self::Scroll => "scroll",
            Self::Wheel => "wheel",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Input => "input",
            Self::Navigation => "navigation",
        };
        f.write_str(name)
    }
}

/// One interaction signal.
///
/// `genuine` is `false` for events the application dispatched itself
/// (synthetic clicks, programmatic focus); those never count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub category: SignalCategory,
    pub genuine: bool,
}

impl Signal {
    /// A signal produced by the user.
    pub fn genuine(category: SignalCategory) -> Self {
        Self {
            category,
            genuine: true,
        }
    }

    /// A signal the application dispatched programmatically.
    pub fn synthetic(category: SignalCategory) -> Self {
        Self {
            category,
            genuine: false,
        }
    }
}
