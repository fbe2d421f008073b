//! Reconnection Policy
//!
//! Exponential backoff for re-establishing a lost venue session:
//! `delay(k) = min(initial * multiplier^k, max)`, optionally jittered.
//! With the defaults this yields 2s, 4s, 8s, 16s, 32s, then 60s.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::config::ConnectionSettings;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%). Zero disables it.
    pub jitter_factor: f64,
    /// Attempts before giving up (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create configuration from connection settings.
    #[must_use]
    pub const fn from_settings(settings: &ConnectionSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: settings.reconnect_jitter_factor,
            max_attempts: settings.max_reconnect_attempts,
        }
    }

    /// Un-jittered delay before attempt `attempt` (zero-based).
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        let initial_ms = self.initial_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        // A multiplier below 1 (or NaN) would make delays shrink.
        let scaled = initial_ms * self.multiplier.max(1.0).powi(exponent);
        let max_ms = self.max_delay.as_millis();

        let millis = if scaled.is_finite() && scaled >= 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                (scaled.round() as u128).min(max_ms)
            }
        } else {
            max_ms
        };
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Delay before attempt `attempt` (zero-based), with jitter applied.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.apply_jitter(self.base_delay(attempt))
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub const fn allows_attempt(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if !self.jitter_factor.is_finite() || self.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_schedule() {
        let config = ReconnectConfig::default();
        let delays: Vec<u64> = (0..8).map(|k| config.base_delay(k).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn default_has_no_jitter() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(8));
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn huge_attempt_is_capped() {
        let config = ReconnectConfig::default();
        assert_eq!(config.base_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn attempt_budget() {
        let config = ReconnectConfig {
            max_attempts: 3,
            ..ReconnectConfig::default()
        };

        let delays: Vec<Duration> = (0..)
            .take_while(|&attempt| config.allows_attempt(attempt))
            .map(|attempt| config.delay_for_attempt(attempt))
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
        assert!(!config.allows_attempt(3));
    }

    #[test]
    fn zero_max_attempts_is_unlimited() {
        let config = ReconnectConfig {
            max_attempts: 0,
            ..ReconnectConfig::default()
        };
        assert!((0..1000).all(|attempt| config.allows_attempt(attempt)));
        assert!(config.allows_attempt(u32::MAX));
    }

    #[test]
    fn unusable_factors_do_not_panic_or_shrink() {
        let config = ReconnectConfig {
            multiplier: 0.5,
            jitter_factor: f64::NAN,
            ..ReconnectConfig::default()
        };
        let delays: Vec<Duration> = (0..3).map(|k| config.delay_for_attempt(k)).collect();
        assert_eq!(delays, vec![Duration::from_secs(2); 3]);

        let infinite = ReconnectConfig {
            jitter_factor: f64::INFINITY,
            ..ReconnectConfig::default()
        };
        assert_eq!(infinite.delay_for_attempt(0), Duration::from_secs(2));
    }

    #[test]
    fn jitter_bounds() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(1000),
            jitter_factor: 0.1,
            ..ReconnectConfig::default()
        };
        for _ in 0..100 {
            let millis = config.delay_for_attempt(0).as_millis();
            assert!((900..=1100).contains(&millis), "delay {millis}ms out of bounds");
        }
    }

    proptest! {
        #[test]
        fn delays_are_non_decreasing_and_capped(
            initial_ms in 1u64..10_000,
            max_secs in 1u64..600,
            multiplier in 1.0f64..4.0,
        ) {
            let config = ReconnectConfig {
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_secs(max_secs),
                multiplier,
                jitter_factor: 0.0,
                max_attempts: 0,
            };
            let mut previous = Duration::ZERO;
            for attempt in 0..20 {
                let delay = config.base_delay(attempt);
                prop_assert!(delay <= config.max_delay);
                prop_assert!(delay >= previous);
                previous = delay;
            }
        }
    }
}
