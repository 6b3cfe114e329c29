//! Exponential backoff policy for transient provider failures.
//!
//! Retries happen inside the worker that owns the job; they are never
//! observable as a job status change. Only the retry count is recorded.

use std::time::Duration;

use rand::Rng;

/// Default maximum number of transient retries before a failure is fatal.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for the exponential backoff schedule.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Cap on any single backoff delay, jitter included.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Backoff schedule for retrying transient provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// How many times a transient failure is retried before it is fatal.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Whether another retry is allowed after `attempts` failed attempts.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_retries
    }

    /// Deterministic delay before retry number `attempt` (0-based):
    /// `base * 2^attempt`, capped at [`MAX_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .min(MAX_DELAY)
    }

    /// [`delay_for`](Self::delay_for) with up to 25% random jitter added,
    /// so workers retrying the same flapping provider do not align.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let jitter_ms = base.as_millis() as u64 / 4;
        if jitter_ms == 0 {
            return base;
        }
        let extra = rand::rng().random_range(0..=jitter_ms);
        (base + Duration::from_millis(extra)).min(MAX_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::new(32, Duration::from_secs(1));
        assert_eq!(policy.delay_for(30), Duration::from_secs(60));
    }

    #[test]
    fn allows_retry_below_cap() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
        assert!(!policy.allows_retry(4));
    }

    #[test]
    fn zero_max_retries_never_retries() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert!(!policy.allows_retry(0));
    }

    #[test]
    fn jittered_delay_within_bounds() {
        let policy = RetryPolicy::new(3, Duration::from_millis(800));
        for attempt in 0..3 {
            let base = policy.delay_for(attempt);
            let jittered = policy.jittered_delay_for(attempt);
            assert!(jittered >= base);
            assert!(jittered <= base + base / 4);
        }
    }
}
