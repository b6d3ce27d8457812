//! Delay computation for repeated feed failures

use std::time::{Duration, SystemTime};

/// Backoff policy for a feed that keeps failing
///
/// The first failure waits `base_delay`; each further consecutive failure
/// doubles it, never exceeding `max_delay`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Compute the delay before retrying after `failures` consecutive failures.
///
/// `failures` counts the failure that just happened, so `1` yields roughly
/// `base_delay`. The result is `min(base_delay * 2^(failures-1) + jitter, max_delay)`
/// and never drops below `base_delay`.
///
/// Jitter is 0-25% of the computed delay, derived from `SystemTime` to avoid
/// pulling in a full random number generator.
#[must_use]
pub fn delay_for_failures(policy: &BackoffPolicy, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1);
    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(exponent));
    let base = base.min(policy.max_delay);

    // Derive a simple jitter from subsecond nanos of the system clock
    let jitter_nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    // Scale to 0-25% of the base delay
    let jitter_fraction = f64::from(jitter_nanos % 250) / 1000.0;
    let jitter = base.mul_f64(jitter_fraction);

    (base + jitter).min(policy.max_delay).max(policy.base_delay.min(policy.max_delay))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
        }
    }

    #[test]
    fn first_failure_uses_base_delay() {
        let d = delay_for_failures(&policy(), 1);
        assert!(d >= Duration::from_secs(10), "delay {d:?} below base");
        assert!(d <= Duration::from_millis(12_500), "delay {d:?} above base + 25%");
    }

    #[test]
    fn delay_doubles_per_failure() {
        let d = delay_for_failures(&policy(), 3);
        assert!(d >= Duration::from_secs(40), "delay {d:?} below 40s");
        assert!(d <= Duration::from_secs(50), "delay {d:?} above 40s + 25%");
    }

    #[test]
    fn delay_is_capped() {
        assert_eq!(delay_for_failures(&policy(), 10), Duration::from_secs(60));
        assert_eq!(delay_for_failures(&policy(), u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn zero_failures_behaves_like_one() {
        let d = delay_for_failures(&policy(), 0);
        assert!(d >= Duration::from_secs(10));
        assert!(d <= Duration::from_millis(12_500));
    }

    #[test]
    fn cap_equal_to_base_disables_growth() {
        let flat = BackoffPolicy {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
        };
        for failures in 1..6 {
            assert_eq!(delay_for_failures(&flat, failures), Duration::from_secs(10));
        }
    }
}
