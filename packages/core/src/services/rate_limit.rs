//! Advisory throttling between communities.
//!
//! Reddit reports its remaining request quota on every response. When the
//! quota runs low the runner pauses until the window resets. The pause is
//! applied after a community's report is complete, never during aggregation.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Quota headers from the most recent upstream response
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub used: Option<f64>,
    pub remaining: Option<f64>,
    /// Seconds until the quota window resets.
    pub reset_seconds: Option<f64>,
}

impl RateLimitStatus {
    /// Read `X-Ratelimit-*` headers. Missing, malformed or non-finite values
    /// become `None`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
        };
        Self {
            used: read("x-ratelimit-used"),
            remaining: read("x-ratelimit-remaining"),
            reset_seconds: read("x-ratelimit-reset"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_none() && self.remaining.is_none() && self.reset_seconds.is_none()
    }
}

/// When and how long to pause
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Pause once `remaining` drops to this value or below.
    pub remaining_threshold: f64,
    pub buffer: Duration,
    /// Upper bound on a single pause, whatever the reset header says.
    pub max_pause: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            remaining_threshold: 10.0,
            buffer: Duration::from_secs(5),
            max_pause: Duration::from_secs(15 * 60),
        }
    }
}

impl BackoffPolicy {
    /// Pause required for `status`, or `None` when the quota is healthy or unknown.
    pub fn backoff_for(&self, status: &RateLimitStatus) -> Option<Duration> {
        let remaining = status.remaining?;
        let reset = status.reset_seconds?;
        if remaining > self.remaining_threshold {
            return None;
        }
        let buffer = self.buffer.as_secs_f64();
        let seconds = (reset + buffer).max(buffer);
        let pause = Duration::try_from_secs_f64(seconds).unwrap_or(self.max_pause);
        Some(pause.min(self.max_pause))
    }
}

/// Sleep if `status` calls for it. Returns the time slept.
pub async fn maybe_backoff(policy: &BackoffPolicy, status: Option<RateLimitStatus>) -> Duration {
    let Some(status) = status else {
        return Duration::ZERO;
    };
    match policy.backoff_for(&status) {
        Some(pause) => {
            tracing::info!(
                remaining = ?status.remaining,
                reset = ?status.reset_seconds,
                sleep_secs = pause.as_secs_f64(),
                "Rate limit low, backing off"
            );
            tokio::time::sleep(pause).await;
            pause
        }
        None => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn status(remaining: Option<f64>, reset: Option<f64>) -> RateLimitStatus {
        RateLimitStatus {
            used: None,
            remaining,
            reset_seconds: reset,
        }
    }

    #[test]
    fn parses_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-used", HeaderValue::from_static("590"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("9.0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("42"));

        let parsed = RateLimitStatus::from_headers(&headers);

        assert_eq!(parsed.used, Some(590.0));
        assert_eq!(parsed.remaining, Some(9.0));
        assert_eq!(parsed.reset_seconds, Some(42.0));
    }

    #[test]
    fn malformed_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("plenty"));

        let parsed = RateLimitStatus::from_headers(&headers);

        assert!(parsed.is_empty());
    }

    #[test]
    fn no_backoff_when_quota_is_healthy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.backoff_for(&status(Some(500.0), Some(100.0))), None);
    }

    #[test]
    fn no_backoff_when_headers_missing() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.backoff_for(&status(None, Some(100.0))), None);
        assert_eq!(policy.backoff_for(&status(Some(1.0), None)), None);
    }

    #[test]
    fn backoff_waits_for_reset_plus_buffer() {
        let policy = BackoffPolicy::default();
        assert_eq!(
            policy.backoff_for(&status(Some(10.0), Some(30.0))),
            Some(Duration::from_secs(35))
        );
    }

    #[test]
    fn backoff_never_shorter_than_buffer() {
        let policy = BackoffPolicy::default();
        assert_eq!(
            policy.backoff_for(&status(Some(0.0), Some(-20.0))),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn infinite_reset_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("inf"));

        let parsed = RateLimitStatus::from_headers(&headers);

        assert_eq!(parsed.remaining, Some(0.0));
        assert_eq!(parsed.reset_seconds, None);
        assert_eq!(BackoffPolicy::default().backoff_for(&parsed), None);
    }

    #[test]
    fn huge_reset_is_capped_at_max_pause() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1e300"));
        let policy = BackoffPolicy::default();

        let parsed = RateLimitStatus::from_headers(&headers);

        assert_eq!(policy.backoff_for(&parsed), Some(policy.max_pause));
    }

    #[test]
    fn non_finite_reset_never_panics() {
        let policy = BackoffPolicy::default();
        assert_eq!(
            policy.backoff_for(&status(Some(0.0), Some(f64::INFINITY))),
            Some(policy.max_pause)
        );
        assert_eq!(
            policy.backoff_for(&status(Some(0.0), Some(f64::NAN))),
            Some(policy.buffer)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn maybe_backoff_sleeps_for_the_computed_pause() {
        let policy = BackoffPolicy::default();
        let started = tokio::time::Instant::now();

        let slept = maybe_backoff(&policy, Some(status(Some(2.0), Some(10.0)))).await;

        assert_eq!(slept, Duration::from_secs(15));
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test]
    async fn maybe_backoff_without_status_returns_immediately() {
        let slept = maybe_backoff(&BackoffPolicy::default(), None).await;
        assert_eq!(slept, Duration::ZERO);
    }
}
