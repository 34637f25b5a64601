use std::time::Duration;

use chrono::{DateTime, Utc};

/// Bounded exponential backoff for failed attempts.
///
/// Attempt `n` waits `base_delay * 2^(n-1)`, capped at `max_delay`. Once
/// `max_attempts` have run the job is out of budget and fails permanently.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    /// Delay before the attempt after `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(base_ms.saturating_mul(factor)).min(self.max_delay)
    }

    /// When to run the next attempt, or `None` when the budget is spent.
    pub fn next_retry_at(&self, attempt: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if attempt >= self.max_attempts {
            return None;
        }
        let backoff = self.backoff(attempt);
        Some(now + chrono::Duration::milliseconds(backoff.as_millis() as i64))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 64,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
        assert_eq!(policy.backoff(63), Duration::from_secs(30));
    }

    #[test]
    fn retries_stop_at_max_attempts() {
        let policy = RetryPolicy::default();
        let now = Utc::now();

        let first = policy.next_retry_at(1, now).unwrap();
        assert_eq!(first, now + chrono::Duration::seconds(1));
        let second = policy.next_retry_at(2, now).unwrap();
        assert_eq!(second, now + chrono::Duration::seconds(2));

        assert!(policy.next_retry_at(3, now).is_none());
        assert!(policy.next_retry_at(4, now).is_none());
    }
}
