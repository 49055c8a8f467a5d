//! What a timer widget needs to draw the session state.
//!
//! The presentation layer never reads the session record itself. It asks
//! for a [`DisplayState`] and renders that: a kind, the time left on
//! whichever clock is currently running, and how much of it is left as a
//! percentage.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sessionward_checker::SessionPhase;
use sessionward_store::{SessionSnapshot, remaining_until};
use sessionward_types::{Timestamp, WardConfig};

/// Which clock the widget is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayKind {
    /// The access window is running.
    Valid,
    /// The renewal countdown is running.
    Prompting,
    Terminated,
}

impl fmt::Display for DisplayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "Valid"),
            Self::Prompting => write!(f, "Prompting"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}

/// A read-only view of the session for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    pub kind: DisplayKind,
    pub time_remaining: Duration,
    /// Share of the running clock still left, `0.0..=100.0`.
    pub progress_percent: f64,
}

impl DisplayState {
    pub const TERMINATED: Self = Self {
        kind: DisplayKind::Terminated,
        time_remaining: Duration::ZERO,
        progress_percent: 0.0,
    };

    /// Derives the display from the phase and a snapshot taken at `now`.
    ///
    /// `AwaitingPrompt` is shown as a `Valid` window with nothing left:
    /// the prompt is about to appear, but the countdown hasn't started.
    pub fn derive(
        phase: SessionPhase,
        snapshot: &SessionSnapshot,
        now: Timestamp,
        config: &WardConfig,
    ) -> Self {
        if !phase.is_authenticated() || !snapshot.access_token_present {
            return Self::TERMINATED;
        }

        let (kind, remaining, total) = match phase {
            SessionPhase::Prompting => (
                DisplayKind::Prompting,
                remaining_until(snapshot.renewal_countdown_expiry, now),
                config.countdown_window,
            ),
            _ => (
                DisplayKind::Valid,
                remaining_until(snapshot.access_window_expiry, now),
                snapshot.access_window.unwrap_or(config.access_window),
            ),
        };

        let time_remaining = remaining.unwrap_or(Duration::ZERO);
        Self {
            kind,
            time_remaining,
            progress_percent: percent(time_remaining, total),
        }
    }

    /// `mm:ss` of the remaining time, rounded up so a running clock never
    /// shows `00:00` early.
    pub fn label(&self) -> String {
        let millis = self.time_remaining.as_millis();
        let secs = millis.div_ceil(1_000);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

fn percent(remaining: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    (remaining.as_secs_f64() / total.as_secs_f64() * 100.0).clamp(0.0, 100.0)
}
