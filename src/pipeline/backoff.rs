//! Capped exponential backoff after failed fetches.
//!
//! Delays: base, 2×base, 4×base, ... never above the cap. Upstream status
//! errors (rate limiting, 5xx) start from a larger base so the watcher eases
//! off a site that is pushing back, and a `Retry-After` hint is honoured up
//! to the cap.

use std::time::Duration;

use crate::error::{FetchError, FetchErrorKind};
use crate::models::WatchConfig;

/// Backoff policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    /// Multiplier for `UpstreamStatus` failures
    pub upstream_factor: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            base: Duration::from_secs(config.backoff_base_secs),
            max: Duration::from_secs(config.backoff_max_secs),
            upstream_factor: config.upstream_backoff_factor.max(1),
        }
    }

    /// Delay before retrying after the `attempt`-th consecutive failure
    /// (1-based) that ended with `error`.
    pub fn delay_for(&self, attempt: u32, error: &FetchError) -> Duration {
        let factor = match error.kind {
            FetchErrorKind::UpstreamStatus => self.upstream_factor,
            FetchErrorKind::Network | FetchErrorKind::Parse => 1,
        };
        let computed = self.scaled_delay(attempt, factor);
        match error.retry_after {
            Some(hint) => computed.max(hint).min(self.max),
            None => computed,
        }
    }

    fn scaled_delay(&self, attempt: u32, factor: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let multiplier = 1u32
            .checked_shl(exponent)
            .and_then(|m| m.checked_mul(factor))
            .unwrap_or(u32::MAX);
        self.base
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_secs(30),
            max: Duration::from_secs(300),
            upstream_factor: 2,
        }
    }

    #[test]
    fn test_doubles_until_cap() {
        let p = policy();
        let err = FetchError::network("timeout");
        assert_eq!(p.delay_for(1, &err), Duration::from_secs(30));
        assert_eq!(p.delay_for(2, &err), Duration::from_secs(60));
        assert_eq!(p.delay_for(3, &err), Duration::from_secs(120));
        assert_eq!(p.delay_for(4, &err), Duration::from_secs(240));
        assert_eq!(p.delay_for(5, &err), Duration::from_secs(300));
        assert_eq!(p.delay_for(50, &err), Duration::from_secs(300));
    }

    #[test]
    fn test_monotonic_and_capped() {
        let p = policy();
        let err = FetchError::network("timeout");
        let mut previous = Duration::ZERO;
        for attempt in 1..200 {
            let delay = p.delay_for(attempt, &err);
            assert!(delay >= previous, "attempt {attempt} decreased");
            assert!(delay <= p.max, "attempt {attempt} exceeded cap");
            previous = delay;
        }
    }

    #[test]
    fn test_upstream_status_backs_off_harder() {
        let p = policy();
        let network = FetchError::network("reset");
        let upstream = FetchError::upstream(503, None);
        assert_eq!(p.delay_for(1, &network), Duration::from_secs(30));
        assert_eq!(p.delay_for(1, &upstream), Duration::from_secs(60));
        assert_eq!(p.delay_for(10, &upstream), p.max);
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let p = policy();
        let short = FetchError::upstream(429, Some(Duration::from_secs(90)));
        let huge = FetchError::upstream(429, Some(Duration::from_secs(3600)));
        assert_eq!(p.delay_for(1, &short), Duration::from_secs(90));
        assert_eq!(p.delay_for(1, &huge), p.max);
    }

    #[test]
    fn test_zero_attempt_uses_base() {
        assert_eq!(
            policy().delay_for(0, &FetchError::network("reset")),
            Duration::from_secs(30)
        );
    }
}
