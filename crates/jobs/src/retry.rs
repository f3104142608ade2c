//! Retry policy calculator (C1). Pure, stateless.
//!
//! Grounded in the teacher's `RetryPolicy::delay_for_attempt` /
//! `should_retry`, generalized to three backoff shapes plus a pluggable
//! jitter source so tests can assert exact bounds instead of a pseudo-random
//! approximation.

use rand::Rng;

use crate::types::{BackoffStrategy, RetryPolicy};

/// Supplies the jitter factor `NextDelay` multiplies the raw delay by.
///
/// Exists so tests can substitute a fixed draw; the shipped source draws
/// uniformly from the policy's configured jitter range via `rand`.
pub trait JitterSource: Send + Sync {
    fn jitter_factor(&self, min: f64, max: f64) -> f64;
}

/// Uniform draw from `[min, max]` via the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandJitterSource;

impl JitterSource for RandJitterSource {
    fn jitter_factor(&self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..max)
    }
}

/// Always returns the same factor. For deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitterSource(pub f64);

impl JitterSource for FixedJitterSource {
    fn jitter_factor(&self, _min: f64, _max: f64) -> f64 {
        self.0
    }
}

/// Delay (milliseconds) before the next attempt. `retry_count` is 0-based:
/// the delay for the first retry uses `retry_count = 0`.
pub fn next_delay(policy: &RetryPolicy, retry_count: u32, jitter: &dyn JitterSource) -> u64 {
    if !policy.enabled {
        return 0;
    }

    let base = policy.base_delay_ms as f64;
    let raw = match policy.strategy {
        BackoffStrategy::Constant => base,
        BackoffStrategy::Linear => base * (retry_count as f64 + 1.0),
        BackoffStrategy::Exponential => base * 2f64.powi(retry_count as i32),
    };

    let capped = match policy.max_delay_ms {
        Some(max) => raw.min(max as f64),
        None => raw,
    };

    let factor = jitter.jitter_factor(policy.min_jitter_factor, policy.max_jitter_factor);
    (capped * (1.0 + factor)).round().max(0.0) as u64
}

/// Whether another attempt is permitted: the policy must be enabled, the
/// retry budget must not be exhausted, and the handler must have signaled
/// retryability. `retry_count == max_retries` consumes the budget.
pub fn should_retry(policy: &RetryPolicy, retry_count: u32, handler_signaled_retry: bool) -> bool {
    policy.enabled && retry_count < policy.max_retries && handler_signaled_retry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> FixedJitterSource {
        FixedJitterSource(0.0)
    }

    #[test]
    fn disabled_policy_has_zero_delay() {
        let policy = RetryPolicy::disabled();
        assert_eq!(next_delay(&policy, 0, &no_jitter()), 0);
    }

    #[test]
    fn constant_backoff_is_constant() {
        let policy = RetryPolicy {
            strategy: BackoffStrategy::Constant,
            base_delay_ms: 500,
            max_delay_ms: None,
            ..RetryPolicy::default()
        };
        assert_eq!(next_delay(&policy, 0, &no_jitter()), 500);
        assert_eq!(next_delay(&policy, 5, &no_jitter()), 500);
    }

    #[test]
    fn linear_backoff_scales_with_retry_count() {
        let policy = RetryPolicy {
            strategy: BackoffStrategy::Linear,
            base_delay_ms: 100,
            max_delay_ms: None,
            ..RetryPolicy::default()
        };
        assert_eq!(next_delay(&policy, 0, &no_jitter()), 100);
        assert_eq!(next_delay(&policy, 1, &no_jitter()), 200);
        assert_eq!(next_delay(&policy, 2, &no_jitter()), 300);
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            strategy: BackoffStrategy::Exponential,
            base_delay_ms: 100,
            max_delay_ms: Some(350),
            ..RetryPolicy::default()
        };
        assert_eq!(next_delay(&policy, 0, &no_jitter()), 100);
        assert_eq!(next_delay(&policy, 1, &no_jitter()), 200);
        assert_eq!(next_delay(&policy, 2, &no_jitter()), 350);
        assert_eq!(next_delay(&policy, 3, &no_jitter()), 350);
    }

    #[test]
    fn jitter_is_applied_multiplicatively() {
        let policy = RetryPolicy {
            strategy: BackoffStrategy::Constant,
            base_delay_ms: 1000,
            max_delay_ms: None,
            ..RetryPolicy::default()
        };
        assert_eq!(next_delay(&policy, 0, &FixedJitterSource(0.2)), 1200);
        assert_eq!(next_delay(&policy, 0, &FixedJitterSource(-0.2)), 800);
    }

    #[test]
    fn should_retry_respects_budget_and_handler_signal() {
        let policy = RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::default()
        };
        assert!(should_retry(&policy, 0, true));
        assert!(should_retry(&policy, 2, true));
        assert!(!should_retry(&policy, 3, true));
        assert!(!should_retry(&policy, 0, false));
    }

    #[test]
    fn disabled_policy_never_retries() {
        let policy = RetryPolicy::disabled();
        assert!(!should_retry(&policy, 0, true));
    }

    #[test]
    fn rand_jitter_source_stays_within_range() {
        let policy_min = -0.2;
        let policy_max = 0.2;
        let source = RandJitterSource;
        for _ in 0..100 {
            let f = source.jitter_factor(policy_min, policy_max);
            assert!((policy_min..policy_max).contains(&f));
        }
    }
}
