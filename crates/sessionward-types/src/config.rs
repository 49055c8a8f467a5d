//! Session lifecycle configuration.
//!
//! Every duration the state machine uses lives here. Nothing else in the
//! workspace hard-codes a timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ConfigError;

/// Durations and switches that drive the session lifecycle.
///
/// In JSON every duration is written in milliseconds with an `_ms` suffix,
/// and any field may be omitted to keep its default:
///
/// ```json
/// { "access_window_ms": 60000, "countdown_window_ms": 60000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardConfig {
    /// How long the access window stays open after the last activity.
    #[serde(rename = "access_window_ms", with = "millis")]
    pub access_window: Duration,

    /// How long the user has to answer the prompt once the access window
    /// has closed. Activity does not extend this.
    #[serde(rename = "countdown_window_ms", with = "millis")]
    pub countdown_window: Duration,

    /// Remaining access-window time at or below which an active user's
    /// session is refreshed proactively.
    #[serde(rename = "renewal_threshold_ms", with = "millis")]
    pub renewal_threshold: Duration,

    /// Minimum spacing between two prompt displays.
    #[serde(rename = "min_modal_gap_ms", with = "millis")]
    pub min_modal_gap: Duration,

    /// Delay between showing the prompt and forcing a logout.
    #[serde(rename = "auto_terminate_delay_ms", with = "millis")]
    pub auto_terminate_delay: Duration,

    /// Reconciliation poll interval. Zero disables polling; reconciliation
    /// then only runs on activity pulses and explicit calls.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    /// Upper bound of the random delay added to the first poll, so that
    /// many sessions started at once don't reconcile in lockstep.
    #[serde(rename = "poll_jitter_ms", with = "millis")]
    pub poll_jitter: Duration,

    /// Minimum spacing between pulses from high-frequency signals
    /// (pointer move, scroll, wheel).
    #[serde(rename = "activity_throttle_ms", with = "millis")]
    pub activity_throttle: Duration,

    /// Time since the last activity after which the user counts as idle
    /// for the proactive-refresh heuristic.
    #[serde(rename = "idle_threshold_ms", with = "millis")]
    pub idle_threshold: Duration,

    /// Suppress activity pulses while the host application is unfocused.
    pub require_focus: bool,

    /// Refresh the session in the background while the user is active and
    /// the access window is about to close.
    pub proactive_renewal: bool,
}

impl Default for WardConfig {
    fn default() -> Self {
        Self {
            access_window: Duration::from_secs(120),
            countdown_window: Duration::from_secs(120),
            renewal_threshold: Duration::from_secs(30),
            min_modal_gap: Duration::from_secs(5),
            auto_terminate_delay: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            poll_jitter: Duration::ZERO,
            activity_throttle: Duration::from_secs(1),
            idle_threshold: Duration::from_secs(60),
            require_focus: true,
            proactive_renewal: true,
        }
    }
}

impl WardConfig {
    /// Shortest window the config accepts. A zero window would expire
    /// every session at the instant it is created.
    pub const MIN_WINDOW: Duration = Duration::from_secs(1);

    /// Parses a JSON config and validates it.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON or wrongly typed
    /// fields. Out-of-range values are clamped, not rejected.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Rules:
    /// - `access_window` and `countdown_window` are at least [`Self::MIN_WINDOW`].
    /// - `renewal_threshold` is strictly below `access_window` (otherwise
    ///   every reconciliation tick would refresh); it is halved down to
    ///   `access_window / 2` when too large.
    /// - `idle_threshold` is at most `access_window - renewal_threshold`,
    ///   so a user who did nothing since sign-in counts as idle by the
    ///   time proactive renewal is considered.
    /// - A zero `auto_terminate_delay` falls back to `countdown_window`.
    pub fn validated(mut self) -> Self {
        if self.access_window < Self::MIN_WINDOW {
            warn!(
                access_window_ms = self.access_window.as_millis() as u64,
                "access window below minimum, clamping"
            );
            self.access_window = Self::MIN_WINDOW;
        }
        if self.countdown_window < Self::MIN_WINDOW {
            warn!(
                countdown_window_ms = self.countdown_window.as_millis() as u64,
                "countdown window below minimum, clamping"
            );
            self.countdown_window = Self::MIN_WINDOW;
        }
        if self.renewal_threshold >= self.access_window {
            let clamped = self.access_window / 2;
            warn!(
                renewal_threshold_ms = self.renewal_threshold.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "renewal threshold not below access window, clamping"
            );
            self.renewal_threshold = clamped;
        }
        let idle_cap = self.access_window - self.renewal_threshold;
        if self.idle_threshold > idle_cap {
            warn!(
                idle_threshold_ms = self.idle_threshold.as_millis() as u64,
                clamped_ms = idle_cap.as_millis() as u64,
                "idle threshold would keep idle sessions alive, clamping"
            );
            self.idle_threshold = idle_cap;
        }
        if self.auto_terminate_delay.is_zero() {
            warn!("auto-terminate delay is zero, using countdown window");
            self.auto_terminate_delay = self.countdown_window;
        }
        if self.auto_terminate_delay != self.countdown_window {
            debug!(
                auto_terminate_delay_ms = self.auto_terminate_delay.as_millis() as u64,
                countdown_window_ms = self.countdown_window.as_millis() as u64,
                "auto-terminate delay differs from countdown window"
            );
        }
        self
    }
}

/// `Duration` as integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
