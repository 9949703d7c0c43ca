//! Fetch policy configuration.

use std::time::Duration;

/// Every watchdog is clamped to this ceiling, so no entity can stay in a
/// loading state longer than 15 seconds even with a misconfigured policy.
pub const WATCHDOG_CEILING: Duration = Duration::from_secs(15);

/// Configuration for one entity's fetch behavior: watchdog duration and the
/// bounded automatic retry.
#[derive(Debug, Copy, Clone)]
pub struct FetchPolicy {
    /// Failed attempts allowed before the entity goes terminal.
    pub max_retries: u32,
    /// Fixed delay before a scheduled retry fires.
    pub retry_delay: Duration,
    /// How long an attempt may stay in flight before the watchdog forces it
    /// out of the loading state.
    pub watchdog: Duration,
}

impl FetchPolicy {
    /// Policy for the page's primary entity: tight watchdog, full retry.
    pub fn primary() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            watchdog: Duration::from_secs(10),
        }
    }

    /// Policy for secondary entities (related lists): the global ceiling is
    /// the only watchdog.
    pub fn background() -> Self {
        Self {
            watchdog: WATCHDOG_CEILING,
            ..Self::primary()
        }
    }

    /// Policy for best-effort sub-resources: no automatic retry.
    pub fn best_effort() -> Self {
        Self {
            max_retries: 0,
            ..Self::background()
        }
    }

    /// The watchdog actually armed, after clamping to the ceiling.
    pub fn effective_watchdog(&self) -> Duration {
        self.watchdog.min(WATCHDOG_CEILING)
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::primary()
    }
}
