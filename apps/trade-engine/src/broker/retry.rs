//! Retry policy and exponential backoff shared across broker calls.

use std::time::Duration;

use rand::Rng;

/// Bounded-retry policy for transient broker failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff.
    pub max_backoff: Duration,
    /// Multiplier applied per retry.
    pub multiplier: f64,
    /// Jitter as a fraction of the computed backoff (0.0 disables).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Stateful backoff calculator for one request's retry loop.
#[derive(Debug)]
pub struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current: Duration,
    max: Duration,
    multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoff {
    /// Start a fresh backoff sequence under `policy`.
    #[must_use]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts,
            current: policy.initial_backoff,
            max: policy.max_backoff,
            multiplier: policy.multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Attempts consumed so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The delay before the next retry, or `None` when attempts are spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let base = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.multiplier).min(self.max.as_secs_f64()),
        );

        Some(self.apply_jitter(base))
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return delay;
        }
        let jitter_range = delay.as_secs_f64() * self.jitter_factor;
        let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_without_jitter() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn backoff_doubles_each_retry() {
        let policy = policy_without_jitter();
        let mut backoff = ExponentialBackoff::new(&policy);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(800)));
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn backoff_respects_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            multiplier: 10.0,
            jitter_factor: 0.0,
        };
        let mut backoff = ExponentialBackoff::new(&policy);

        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 100,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(1000),
            multiplier: 1.0,
            jitter_factor: 0.5,
        };
        let mut backoff = ExponentialBackoff::new(&policy);

        for _ in 0..50 {
            let delay = match backoff.next_backoff() {
                Some(d) => d,
                None => break,
            };
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }
}
