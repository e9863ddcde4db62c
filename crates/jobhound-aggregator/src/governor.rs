//! Per-source request pacing and backoff.
//!
//! Every pipeline owns one [`RateGovernor`]; state is never shared between
//! sources and starts fresh with each aggregation run.

use jobhound_core::RateLimitConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Pacing and retry policy applied to one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorPolicy {
    /// Minimum delay between consecutive requests
    pub min_interval: Duration,
    /// First backoff delay
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Transient-failure retries per page
    pub max_retries: u32,
    /// Rate-limit retries per page
    pub max_rate_limit_retries: u32,
}

impl Default for GovernorPolicy {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for GovernorPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_interval_ms),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            max_retries: config.max_retries,
            max_rate_limit_retries: config.max_rate_limit_retries,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then retry the same page
    Retry(Duration),
    /// Retry budget exhausted
    GiveUp,
}

/// Token-style pacing plus exponential backoff for one source.
#[derive(Debug)]
pub struct RateGovernor {
    policy: GovernorPolicy,
    last_request: Option<Instant>,
    rate_limit_delay: Duration,
    transient_attempts: u32,
    rate_limit_attempts: u32,
    total_retries: u32,
}

impl RateGovernor {
    /// Create a governor with fresh state.
    #[must_use]
    pub fn new(policy: GovernorPolicy) -> Self {
        Self {
            policy,
            last_request: None,
            rate_limit_delay: Duration::ZERO,
            transient_attempts: 0,
            rate_limit_attempts: 0,
            total_retries: 0,
        }
    }

    /// Current spacing between requests: the minimum interval, raised by any
    /// rate-limit delay accumulated so far.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.policy.min_interval.max(self.rate_limit_delay)
    }

    /// How long the caller must wait before the next request.
    #[must_use]
    pub fn wait_time(&self) -> Duration {
        match self.last_request {
            Some(last) => self.interval().saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Note that a request is being sent now.
    pub fn record_request(&mut self) {
        self.last_request = Some(Instant::now());
    }

    /// A page succeeded; per-page retry counters reset.
    pub fn on_success(&mut self) {
        self.transient_attempts = 0;
        self.rate_limit_attempts = 0;
    }

    /// A transient failure occurred.
    pub fn on_transient_failure(&mut self) -> RetryDecision {
        self.transient_attempts += 1;
        if self.transient_attempts > self.policy.max_retries {
            return RetryDecision::GiveUp;
        }
        self.total_retries += 1;
        let exponent = self.transient_attempts.saturating_sub(1).min(16);
        let delay = self
            .policy
            .initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.policy.max_backoff);
        RetryDecision::Retry(delay)
    }

    /// The source signalled a rate limit; the delay doubles up to the ceiling.
    pub fn on_rate_limited(&mut self, retry_after: Option<Duration>) -> RetryDecision {
        self.rate_limit_attempts += 1;
        if self.rate_limit_attempts > self.policy.max_rate_limit_retries {
            return RetryDecision::GiveUp;
        }
        self.total_retries += 1;
        self.rate_limit_delay = if self.rate_limit_delay.is_zero() {
            self.policy.initial_backoff
        } else {
            self.rate_limit_delay.saturating_mul(2)
        }
        .min(self.policy.max_backoff);

        let delay = retry_after
            .map_or(self.rate_limit_delay, |hint| hint.max(self.rate_limit_delay))
            .min(self.policy.max_backoff);
        RetryDecision::Retry(delay)
    }

    /// Retries granted so far in this run.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.total_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> GovernorPolicy {
        GovernorPolicy {
            min_interval: Duration::from_millis(500),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            max_retries: 3,
            max_rate_limit_retries: 4,
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = GovernorPolicy::from(&RateLimitConfig::default());
        assert_eq!(policy.min_interval, Duration::from_millis(500));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_transient_backoff_is_exponential_and_bounded() {
        let mut governor = RateGovernor::new(policy());
        assert_eq!(
            governor.on_transient_failure(),
            RetryDecision::Retry(Duration::from_secs(1))
        );
        assert_eq!(
            governor.on_transient_failure(),
            RetryDecision::Retry(Duration::from_secs(2))
        );
        assert_eq!(
            governor.on_transient_failure(),
            RetryDecision::Retry(Duration::from_secs(4))
        );
        assert_eq!(governor.on_transient_failure(), RetryDecision::GiveUp);
        assert_eq!(governor.retries(), 3);

        governor.on_success();
        assert_eq!(
            governor.on_transient_failure(),
            RetryDecision::Retry(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_rate_limit_doubles_to_ceiling() {
        let mut governor = RateGovernor::new(policy());
        let delays: Vec<RetryDecision> = (0..5).map(|_| governor.on_rate_limited(None)).collect();
        assert_eq!(
            delays,
            vec![
                RetryDecision::Retry(Duration::from_secs(1)),
                RetryDecision::Retry(Duration::from_secs(2)),
                RetryDecision::Retry(Duration::from_secs(4)),
                RetryDecision::Retry(Duration::from_secs(5)),
                RetryDecision::GiveUp,
            ]
        );
        // Pacing stays at the raised delay after recovery.
        governor.on_success();
        assert_eq!(governor.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_hint_is_honoured_within_ceiling() {
        let mut governor = RateGovernor::new(policy());
        assert_eq!(
            governor.on_rate_limited(Some(Duration::from_secs(3))),
            RetryDecision::Retry(Duration::from_secs(3))
        );
        assert_eq!(
            governor.on_rate_limited(Some(Duration::from_secs(120))),
            RetryDecision::Retry(Duration::from_secs(5))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_respects_min_interval() {
        let mut governor = RateGovernor::new(policy());
        assert_eq!(governor.wait_time(), Duration::ZERO);

        governor.record_request();
        assert_eq!(governor.wait_time(), Duration::from_millis(500));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(governor.wait_time(), Duration::from_millis(300));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(governor.wait_time(), Duration::ZERO);
    }
}
