use serde::{Deserialize, Serialize};

/// Interval between build-farm status queries.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Delay policy for the status poller.
///
/// The default keeps the farm's historical cadence: a fixed 10 minute wait
/// between ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    Fixed { secs: u64 },
    Exponential { initial_secs: u64, max_secs: u64 },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed { secs: DEFAULT_POLL_INTERVAL_SECS }
    }
}

impl Backoff {
    /// Seconds to wait after the `attempt`-th pending tick (1-based).
    pub fn delay_seconds(&self, attempt: u32) -> u64 {
        match *self {
            Backoff::Fixed { secs } => secs,
            Backoff::Exponential { initial_secs, max_secs } => {
                let shift = attempt.saturating_sub(1).min(32);
                initial_secs.saturating_mul(1u64 << shift).min(max_secs)
            }
        }
    }
}
