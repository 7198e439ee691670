//! Retry policy: response classification plus a backoff schedule.
//!
//! The policy is pure data. [`Client`](crate::Client) asks it two things
//! after every attempt: what kind of outcome was this ([`classify`]), and
//! how long to wait before the next attempt, if there is one
//! ([`RetryPolicy::delay_before_retry`]).

use std::time::Duration;

use arcade_protocol::Endpoint;
use tracing::warn;

/// How a response status is treated by bounded backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx. Done.
    Success,
    /// 5xx, 1xx, or anything else unexpected. Try again after a delay.
    Retryable,
    /// 300–499. The hypervisor refused; repeating won't change its mind.
    Fatal,
}

/// Classifies an HTTP status.
///
/// ```rust
/// use arcade_transport::{Outcome, classify};
///
/// assert_eq!(classify(200), Outcome::Success);
/// assert_eq!(classify(404), Outcome::Fatal);
/// assert_eq!(classify(503), Outcome::Retryable);
/// ```
pub fn classify(status: u16) -> Outcome {
    match status {
        200..=299 => Outcome::Success,
        300..=499 => Outcome::Fatal,
        _ => Outcome::Retryable,
    }
}

/// When and how often a failed call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry every failure, including 4xx, after a fixed interval,
    /// forever.
    ///
    /// Meant for status probes: a game server can boot long before the
    /// hypervisor assigns it work, and until then the probe just waits.
    /// Only valid for idempotent endpoints.
    Poll { interval: Duration },

    /// Linear backoff: after the n-th failed attempt wait `step × n`.
    /// 4xx fails immediately. After `max_attempts` attempts the call
    /// gives up.
    Backoff { step: Duration, max_attempts: u32 },
}

impl RetryPolicy {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
    pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(200);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Unbounded polling every 100 ms.
    pub fn poll() -> Self {
        Self::Poll {
            interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    /// 200 ms linear backoff, 5 attempts.
    pub fn backoff() -> Self {
        Self::Backoff {
            step: Self::DEFAULT_BACKOFF_STEP,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Poll { .. })
    }

    /// Delay to wait after attempt number `failed_attempt` (1-based)
    /// failed, or `None` if no attempts remain.
    pub fn delay_before_retry(&self, failed_attempt: u32) -> Option<Duration> {
        match *self {
            Self::Poll { interval } => Some(interval),
            Self::Backoff { step, max_attempts } => {
                (failed_attempt < max_attempts).then(|| step * failed_attempt)
            }
        }
    }

    /// The full list of waits a call goes through if every attempt fails.
    /// Empty for polling, which has no end.
    pub fn schedule(&self) -> Vec<Duration> {
        match self {
            Self::Poll { .. } => Vec::new(),
            Self::Backoff { max_attempts, .. } => (1..*max_attempts)
                .filter_map(|attempt| self.delay_before_retry(attempt))
                .collect(),
        }
    }
}

/// Which policy applies to which kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Policy for idempotent reads (`GET /api/server`).
    pub status_probe: RetryPolicy,
    /// Policy for everything with side effects.
    pub mutating: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            status_probe: RetryPolicy::poll(),
            mutating: RetryPolicy::backoff(),
        }
    }
}

impl RetryConfig {
    /// Fix any values that would make calls unsafe.
    ///
    /// - A polling policy for mutating calls is replaced with the default
    ///   backoff: repeating a settle forever is never acceptable.
    /// - `max_attempts` of 0 becomes 1 so every call is tried at least once.
    pub fn validated(mut self) -> Self {
        if self.mutating.is_polling() {
            warn!("polling retry policy configured for mutating calls, using bounded backoff");
            self.mutating = RetryPolicy::backoff();
        }
        for policy in [&mut self.status_probe, &mut self.mutating] {
            if let RetryPolicy::Backoff { max_attempts, .. } = policy {
                if *max_attempts == 0 {
                    warn!("max_attempts of 0, clamping to 1");
                    *max_attempts = 1;
                }
            }
        }
        self
    }

    pub fn policy_for(&self, endpoint: Endpoint) -> RetryPolicy {
        if endpoint.is_idempotent() {
            self.status_probe
        } else {
            self.mutating
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(199), Outcome::Retryable);
        assert_eq!(classify(200), Outcome::Success);
        assert_eq!(classify(299), Outcome::Success);
        assert_eq!(classify(300), Outcome::Fatal);
        assert_eq!(classify(499), Outcome::Fatal);
        assert_eq!(classify(500), Outcome::Retryable);
        assert_eq!(classify(503), Outcome::Retryable);
    }

    #[test]
    fn test_backoff_schedule_is_linear() {
        let ms = |n| Duration::from_millis(n);
        assert_eq!(
            RetryPolicy::backoff().schedule(),
            vec![ms(200), ms(400), ms(600), ms(800)]
        );
    }

    #[test]
    fn test_backoff_gives_up_after_max_attempts() {
        let policy = RetryPolicy::backoff();
        assert!(policy.delay_before_retry(4).is_some());
        assert_eq!(policy.delay_before_retry(5), None);
    }

    #[test]
    fn test_poll_never_gives_up() {
        let policy = RetryPolicy::poll();
        assert_eq!(
            policy.delay_before_retry(10_000),
            Some(Duration::from_millis(100))
        );
        assert!(policy.schedule().is_empty());
    }

    #[test]
    fn test_policy_for_uses_poll_only_for_status() {
        let config = RetryConfig::default();
        assert!(config.policy_for(Endpoint::ServerStatus).is_polling());
        for endpoint in Endpoint::ALL {
            if endpoint != Endpoint::ServerStatus {
                assert!(!config.policy_for(endpoint).is_polling(), "{endpoint}");
            }
        }
    }

    #[test]
    fn test_validated_rejects_polling_for_mutating_calls() {
        let config = RetryConfig {
            status_probe: RetryPolicy::poll(),
            mutating: RetryPolicy::poll(),
        }
        .validated();
        assert_eq!(config.mutating, RetryPolicy::backoff());
    }

    #[test]
    fn test_validated_clamps_zero_attempts() {
        let config = RetryConfig {
            status_probe: RetryPolicy::poll(),
            mutating: RetryPolicy::Backoff {
                step: Duration::from_millis(10),
                max_attempts: 0,
            },
        }
        .validated();
        assert_eq!(
            config.mutating,
            RetryPolicy::Backoff {
                step: Duration::from_millis(10),
                max_attempts: 1,
            }
        );
    }
}
