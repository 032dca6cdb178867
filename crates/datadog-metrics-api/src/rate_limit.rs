// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reactive backoff driven by the `X-RateLimit-*` response headers.
//!
//! Datadog reports the state of the quota bucket an endpoint belongs to on
//! every response. The guard looks at those headers after each call and
//! waits for the window to reset once the remaining count reaches zero. It
//! never reissues the call that exhausted the quota; only the next call
//! benefits from the wait.

use crate::endpoint::Endpoint;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tracing::{debug, info};

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_NAME_HEADER: &str = "x-ratelimit-name";
pub const RATE_LIMIT_PERIOD_HEADER: &str = "x-ratelimit-period";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Cap on a per-endpoint deadline whose reset cannot be represented as an
/// instant.
pub const MAX_DEFERRED_WAIT: Duration = Duration::from_secs(86_400);

/// How a missing or unparseable quota header is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderFallback {
    /// Treat the value as `0`. A response without quota headers therefore
    /// counts as exhausted with an immediate reset, which results in a
    /// zero-length wait.
    #[default]
    Zero,
    /// Treat a missing remaining count as "no information" and never wait.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rate limit header fallback '{0}', expected 'zero' or 'ignore'")]
pub struct UnknownHeaderFallback(pub String);

impl FromStr for HeaderFallback {
    type Err = UnknownHeaderFallback;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(Self::Zero),
            "ignore" => Ok(Self::Ignore),
            _ => Err(UnknownHeaderFallback(s.to_string())),
        }
    }
}

/// Which calls a wait applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// A single quota for every endpoint: wait right after the exhausted
    /// response, whatever is called next.
    #[default]
    Global,
    /// Quotas are tracked per endpoint: the wait is deferred until the same
    /// endpoint is called again, calls to other endpoints go through.
    PerEndpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rate limit policy '{0}', expected 'global' or 'per_endpoint'")]
pub struct UnknownRateLimitPolicy(pub String);

impl FromStr for RateLimitPolicy {
    type Err = UnknownRateLimitPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "per_endpoint" | "per-endpoint" => Ok(Self::PerEndpoint),
            _ => Err(UnknownRateLimitPolicy(s.to_string())),
        }
    }
}

/// Quota state reported by a single response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<i64>,
    pub name: Option<String>,
    pub period: Option<i64>,
    pub remaining: Option<i64>,
    pub reset: Option<i64>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_i64(headers, RATE_LIMIT_LIMIT_HEADER),
            name: headers
                .get(RATE_LIMIT_NAME_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            period: header_i64(headers, RATE_LIMIT_PERIOD_HEADER),
            remaining: header_i64(headers, RATE_LIMIT_REMAINING_HEADER),
            reset: header_i64(headers, RATE_LIMIT_RESET_HEADER),
        }
    }

    /// How long to wait before the next call, or `None` if quota is left.
    pub fn backoff(&self, fallback: HeaderFallback) -> Option<Duration> {
        let remaining = match (self.remaining, fallback) {
            (Some(remaining), _) => remaining,
            (None, HeaderFallback::Zero) => 0,
            (None, HeaderFallback::Ignore) => return None,
        };
        if remaining != 0 {
            return None;
        }
        // A negative reset behaves like an immediate one.
        let reset = self.reset.unwrap_or(0).max(0);
        Some(Duration::from_secs(reset.unsigned_abs()))
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Consulted around every API call issued by the client.
#[derive(Debug, Default)]
pub struct RateLimitGuard {
    policy: RateLimitPolicy,
    fallback: HeaderFallback,
    blocked_until: Mutex<HashMap<Endpoint, Instant>>,
}

impl RateLimitGuard {
    pub fn new(policy: RateLimitPolicy, fallback: HeaderFallback) -> Self {
        Self {
            policy,
            fallback,
            blocked_until: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Waits out a pending reset recorded for `endpoint`. Only
    /// [`RateLimitPolicy::PerEndpoint`] records resets, so this returns
    /// immediately under the global policy.
    pub async fn before_request(&self, endpoint: Endpoint) {
        if self.policy != RateLimitPolicy::PerEndpoint {
            return;
        }
        let deadline = self
            .blocked_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&endpoint);
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if deadline > now {
                info!(
                    "Rate Limit Reached for {endpoint}. Sleeping for {} seconds.",
                    (deadline - now).as_secs()
                );
                sleep_until(deadline).await;
            }
        }
    }

    /// Inspects the headers of a response to a call to `endpoint`. `None`
    /// means no response was received and is ignored.
    pub async fn after_response(&self, endpoint: Endpoint, headers: Option<&HeaderMap>) {
        let Some(headers) = headers else {
            return;
        };
        let info = RateLimitInfo::from_headers(headers);
        let Some(wait) = info.backoff(self.fallback) else {
            return;
        };
        debug!(
            endpoint = %endpoint,
            bucket = info.name.as_deref().unwrap_or("unknown"),
            limit = ?info.limit,
            period = ?info.period,
            "rate limit exhausted"
        );

        match self.policy {
            RateLimitPolicy::Global => {
                info!("Rate Limit Reached. Sleeping for {} seconds.", wait.as_secs());
                sleep(wait).await;
            }
            RateLimitPolicy::PerEndpoint => {
                if wait.is_zero() {
                    return;
                }
                let now = Instant::now();
                let deadline = now
                    .checked_add(wait)
                    .unwrap_or_else(|| now + MAX_DEFERRED_WAIT);
                self.blocked_until
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(endpoint, deadline);
                info!(
                    "Rate Limit Reached for {endpoint}. Next call delayed by {} seconds.",
                    wait.as_secs()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use tracing_test::traced_test;

    fn headers(remaining: &str, reset: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            RATE_LIMIT_REMAINING_HEADER,
            HeaderValue::from_str(remaining).unwrap(),
        );
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_str(reset).unwrap());
        headers
    }

    #[test]
    fn test_parse_headers() {
        let mut map = headers("12", "45");
        map.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from_static("100"));
        map.insert(RATE_LIMIT_PERIOD_HEADER, HeaderValue::from_static("60"));
        map.insert(RATE_LIMIT_NAME_HEADER, HeaderValue::from_static("metrics_tags"));
        let info = RateLimitInfo::from_headers(&map);
        assert_eq!(
            info,
            RateLimitInfo {
                limit: Some(100),
                name: Some("metrics_tags".to_string()),
                period: Some(60),
                remaining: Some(12),
                reset: Some(45),
            }
        );
    }

    #[test]
    fn test_backoff_only_when_exhausted() {
        let exhausted = RateLimitInfo::from_headers(&headers("0", "7"));
        assert_eq!(
            exhausted.backoff(HeaderFallback::Zero),
            Some(Duration::from_secs(7))
        );
        let available = RateLimitInfo::from_headers(&headers("3", "7"));
        assert_eq!(available.backoff(HeaderFallback::Zero), None);
    }

    #[test]
    fn test_backoff_with_missing_headers() {
        let info = RateLimitInfo::from_headers(&HeaderMap::new());
        assert_eq!(info.backoff(HeaderFallback::Zero), Some(Duration::ZERO));
        assert_eq!(info.backoff(HeaderFallback::Ignore), None);
    }

    #[test]
    fn test_backoff_with_unparseable_headers() {
        let info = RateLimitInfo::from_headers(&headers("lots", "soon"));
        assert_eq!(info.remaining, None);
        assert_eq!(info.reset, None);
        assert_eq!(info.backoff(HeaderFallback::Zero), Some(Duration::ZERO));
        assert_eq!(info.backoff(HeaderFallback::Ignore), None);
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(
            RateLimitInfo::from_headers(&headers("-1", "5")).backoff(HeaderFallback::Zero),
            None
        );
        assert_eq!(
            RateLimitInfo::from_headers(&headers("0", "-5")).backoff(HeaderFallback::Zero),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "global".parse::<RateLimitPolicy>(),
            Ok(RateLimitPolicy::Global)
        );
        assert_eq!(
            "PER_ENDPOINT".parse::<RateLimitPolicy>(),
            Ok(RateLimitPolicy::PerEndpoint)
        );
        assert!("sometimes".parse::<RateLimitPolicy>().is_err());
    }

    #[test]
    fn test_header_fallback_from_str() {
        assert_eq!("zero".parse::<HeaderFallback>(), Ok(HeaderFallback::Zero));
        assert_eq!(" Ignore ".parse::<HeaderFallback>(), Ok(HeaderFallback::Ignore));
        assert!("skip".parse::<HeaderFallback>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_sleeps_for_reset() {
        let guard = RateLimitGuard::default();
        let start = Instant::now();
        guard
            .after_response(Endpoint::MetricMetadata, Some(&headers("0", "30")))
            .await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_returns_immediately_with_quota_left() {
        let guard = RateLimitGuard::default();
        let start = Instant::now();
        guard
            .after_response(Endpoint::MetricMetadata, Some(&headers("1", "30")))
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_response_is_ignored() {
        let guard = RateLimitGuard::default();
        let start = Instant::now();
        guard.after_response(Endpoint::UsageTopAvgMetrics, None).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_endpoint_defers_wait_to_same_endpoint() {
        let guard = RateLimitGuard::new(RateLimitPolicy::PerEndpoint, HeaderFallback::Zero);
        let start = Instant::now();
        guard
            .after_response(Endpoint::ListTagConfiguration, Some(&headers("0", "10")))
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        // A different endpoint is not held back.
        guard.before_request(Endpoint::MetricMetadata).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        guard.before_request(Endpoint::ListTagConfiguration).await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));

        // The deadline is consumed once waited out.
        guard.before_request(Endpoint::ListTagConfiguration).await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_endpoint_caps_unrepresentable_reset() {
        let guard = RateLimitGuard::new(RateLimitPolicy::PerEndpoint, HeaderFallback::Zero);
        let start = Instant::now();
        guard
            .after_response(
                Endpoint::MetricMetadata,
                Some(&headers("0", &i64::MAX.to_string())),
            )
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        guard.before_request(Endpoint::MetricMetadata).await;
        assert_eq!(start.elapsed(), MAX_DEFERRED_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_endpoint_skips_elapsed_deadline() {
        let guard = RateLimitGuard::new(RateLimitPolicy::PerEndpoint, HeaderFallback::Zero);
        guard
            .after_response(Endpoint::MetricMetadata, Some(&headers("0", "5")))
            .await;
        tokio::time::advance(Duration::from_secs(8)).await;
        let start = Instant::now();
        guard.before_request(Endpoint::MetricMetadata).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_logs_when_sleeping() {
        let guard = RateLimitGuard::default();
        guard
            .after_response(Endpoint::MetricMetadata, Some(&headers("0", "2")))
            .await;
        assert!(logs_contain("Rate Limit Reached. Sleeping for 2 seconds."));
    }
}
