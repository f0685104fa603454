use std::time::Duration;

/// Bounded exponential backoff for reconnecting after a transient
/// connection drop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum reconnect attempts per drop (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt thereafter.
    pub initial_delay: Duration,
    /// Cap on the per-attempt delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before a given attempt (0-indexed). The first attempt is
    /// immediate; delay doubles per attempt up to `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let shift = (attempt - 1).min(10);
        let delay = self.initial_delay.saturating_mul(1 << shift);
        delay.min(self.max_delay)
    }
}
