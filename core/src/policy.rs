//! Reconnect delay policy.
//!
//! Pure arithmetic for the reconnection controller: a fixed base delay
//! with an optional jitter bound. The jitter fraction is drawn by the
//! caller (the runtime layer owns randomness), which keeps this crate
//! deterministic. Jitter spreads reconnect storms out when many tabs or
//! devices lose the same server at once.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Default upper bound on added jitter.
pub const DEFAULT_JITTER: Duration = Duration::from_millis(500);

/// Retry timing for the reconnection controller.
///
/// Retries are unbounded: the session keeps trying until stopped,
/// since the UI has no other way to receive live updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Fixed delay before each reconnect attempt
    pub base_delay: Duration,
    /// Upper bound on jitter added to the base delay (zero disables)
    pub jitter: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RECONNECT_DELAY,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl ReconnectPolicy {
    /// A policy with a fixed delay and no jitter.
    pub fn fixed(base_delay: Duration) -> Self {
        Self {
            base_delay,
            jitter: Duration::ZERO,
        }
    }

    /// Compute the next delay. `jitter_fraction` must be in `[0, 1)`
    /// and is scaled into the configured jitter bound; values outside
    /// the range are clamped.
    pub fn next_delay(&self, jitter_fraction: f64) -> Duration {
        let fraction = jitter_fraction.clamp(0.0, 1.0);
        self.base_delay + self.jitter.mul_f64(fraction)
    }
}
