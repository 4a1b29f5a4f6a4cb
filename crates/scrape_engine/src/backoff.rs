use std::time::Duration;

/// Capped exponential backoff between fetch attempts.
///
/// After failed attempt `n` (1-based) the fetcher waits
/// `min(base * 2^(n-1), cap)` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Delay after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.cap)
            .min(self.cap)
    }

    /// Total sleep of a fetch that fails every one of `max_attempts` attempts.
    pub fn total_for(&self, max_attempts: u32) -> Duration {
        (1..max_attempts).map(|attempt| self.delay_after(attempt)).sum()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1_000), Duration::from_millis(10_000))
    }
}
