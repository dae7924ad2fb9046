//! Exponential-backoff retry policy for external service calls.
//!
//! The policy itself is pure: [`base_delay`] is a deterministic function
//! of the attempt number, so the backoff schedule is unit-testable.
//! [`RetryPolicy::delay_for`] adds jitter on top to spread concurrent
//! retries.

use std::time::Duration;

use rand::Rng;

/// Tunable parameters for retrying a stage call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Exhausting them converts the
    /// last transient failure into a permanent one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Fraction of the base delay added as random jitter (0.2 = up to
    /// +20%).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A policy with no waiting, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    /// Jittered delay to sleep after a failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = base_delay(self, attempt);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let extra = base.as_secs_f64() * rand::rng().random_range(0.0..self.jitter);
        base + Duration::from_secs_f64(extra)
    }
}

/// Deterministic backoff delay after the given failed attempt (1-based):
/// `initial * multiplier^(attempt-1)`, clamped to `max_delay`.
pub fn base_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let factor = policy.multiplier.powi(exponent as i32);
    let delay = policy.initial_delay.as_secs_f64() * factor;
    Duration::from_secs_f64(delay).min(policy.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(base_delay(&policy, 1), Duration::from_secs(1));
        assert_eq!(base_delay(&policy, 2), Duration::from_secs(2));
        assert_eq!(base_delay(&policy, 3), Duration::from_secs(4));
    }

    #[test]
    fn base_delay_clamps_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(base_delay(&policy, 5), Duration::from_secs(10));
        assert_eq!(base_delay(&policy, 30), Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let policy = RetryPolicy::default();
        let expected = [1, 2, 4, 8, 16, 30, 30];
        for (i, &secs) in expected.iter().enumerate() {
            assert_eq!(base_delay(&policy, i as u32 + 1), Duration::from_secs(secs));
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let d = policy.delay_for(2);
            assert!(d >= Duration::from_secs(2));
            // base 2s + at most 20%
            assert!(d <= Duration::from_secs_f64(2.4));
        }
    }

    #[test]
    fn immediate_policy_never_sleeps() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(2), Duration::ZERO);
    }
}
