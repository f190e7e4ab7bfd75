//! Reconnection Policy
//!
//! Exponential backoff for feed reconnection. After the `r`-th consecutive
//! failure the client sleeps `min(max_delay, base^min(r, exponent_cap))`
//! seconds, optionally randomized by a jitter factor.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Base of the exponential (2 doubles the delay each attempt).
    pub base: u32,
    /// Largest exponent applied to `base`.
    pub exponent_cap: u32,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Jitter factor as a fraction (e.g., 0.1 = ±10% randomization).
    pub jitter_factor: f64,
    /// Maximum number of reconnection attempts (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base: 2,
            exponent_cap: 6,
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.0,
            max_attempts: 0, // Unlimited
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(
        base: u32,
        exponent_cap: u32,
        max_delay: Duration,
        jitter_factor: f64,
        max_attempts: u32,
    ) -> Self {
        Self {
            base,
            exponent_cap,
            max_delay,
            jitter_factor,
            max_attempts,
        }
    }

    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            base: settings.backoff_base,
            exponent_cap: settings.backoff_exponent_cap,
            max_delay: settings.backoff_cap,
            jitter_factor: 0.0,
            max_attempts: settings.max_reconnect_attempts,
        }
    }

    /// Un-jittered delay after `failures` consecutive failures.
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.min(self.exponent_cap);
        let secs = u64::from(self.base).saturating_pow(exponent);
        Duration::from_secs(secs).min(self.max_delay)
    }
}

/// Reconnection policy tracking consecutive failures.
///
/// # Example
///
/// ```rust
/// use ticker_terminal::infrastructure::feed::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
///
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(4)));
///
/// // Successful connection
/// policy.reset();
/// assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
        }
    }

    /// Record a failure and return the delay before the next attempt.
    ///
    /// Returns `None` if max attempts have been exceeded.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }

        self.attempt_count = self.attempt_count.saturating_add(1);
        let delay = self.config.delay_for(self.attempt_count);

        Some(self.apply_jitter(delay))
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
    }

    /// Consecutive failures since the last successful connect.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Spread `delay` uniformly over `±jitter_factor`, never below 1ms.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn apply_jitter(&self, delay: Duration) -> Duration {
        let factor = self.config.jitter_factor;
        if factor <= 0.0 || delay.is_zero() {
            return delay;
        }

        let scale = rand::rng().random_range((1.0 - factor)..=(1.0 + factor));
        let millis = (delay.as_millis() as f64 * scale).max(1.0);
        Duration::from_millis(millis as u64)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    #[test_case(1, 2 ; "first failure")]
    #[test_case(2, 4 ; "second failure")]
    #[test_case(4, 16 ; "fourth failure")]
    #[test_case(5, 30 ; "capped at thirty")]
    #[test_case(6, 30 ; "exponent cap reached")]
    #[test_case(50, 30 ; "long outage")]
    fn default_delay_after_failures(failures: u32, secs: u64) {
        assert_eq!(
            ReconnectConfig::default().delay_for(failures),
            Duration::from_secs(secs)
        );
    }

    #[test]
    fn consecutive_failures_back_off() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        let delays: Vec<u64> = std::iter::from_fn(|| policy.next_delay())
            .take(8)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, [2, 4, 8, 16, 30, 30, 30, 30]);
    }

    #[test]
    fn exponent_cap_bounds_growth_without_delay_cap() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(3600),
            ..ReconnectConfig::default()
        };
        assert_eq!(config.delay_for(6), Duration::from_secs(64));
        assert_eq!(config.delay_for(9), Duration::from_secs(64));
    }

    #[test]
    fn connect_resets_failure_count() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        for _ in 0..4 {
            let _ = policy.next_delay();
        }
        assert_eq!(policy.attempt_count(), 4);

        policy.reset();
        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn attempt_budget_is_exhausted() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            max_attempts: 2,
            ..ReconnectConfig::default()
        });

        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempt_count(), 2);
    }

    #[test]
    fn zero_cap_retries_immediately() {
        let config = ReconnectConfig {
            max_delay: Duration::ZERO,
            jitter_factor: 0.5,
            ..ReconnectConfig::default()
        };
        let mut policy = ReconnectPolicy::new(config);
        assert_eq!(policy.next_delay(), Some(Duration::ZERO));
    }

    proptest! {
        #[test]
        fn delay_never_exceeds_cap(failures in 0u32..10_000, cap in 0u64..120) {
            let config = ReconnectConfig {
                max_delay: Duration::from_secs(cap),
                ..ReconnectConfig::default()
            };
            prop_assert!(config.delay_for(failures) <= Duration::from_secs(cap));
        }

        #[test]
        fn delay_is_non_decreasing(failures in 0u32..64) {
            let config = ReconnectConfig::default();
            prop_assert!(config.delay_for(failures) <= config.delay_for(failures + 1));
        }

        #[test]
        fn jitter_stays_in_band(factor in 0.01f64..0.5) {
            let mut policy = ReconnectPolicy::new(ReconnectConfig {
                jitter_factor: factor,
                ..ReconnectConfig::default()
            });
            let millis = policy.next_delay().unwrap().as_millis() as f64;
            prop_assert!(millis >= (2000.0 * (1.0 - factor)).floor());
            prop_assert!(millis <= (2000.0 * (1.0 + factor)).ceil());
        }
    }
}
