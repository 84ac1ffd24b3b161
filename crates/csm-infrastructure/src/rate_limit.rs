//! Sliding-window rate limiter,
//! keyed per `(client_id, endpoint)`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use csm_domain::error::{Error, Result};
use csm_domain::ports::rate_limit::RateLimiter;
use dashmap::DashMap;

/// In-memory sliding-window rate limiter backed by `dashmap`.
///
/// Each `(client_id, endpoint)` pair tracks call timestamps within the
/// trailing window; a call is allowed only while the window holds fewer
/// than `max_calls` entries.
pub struct SlidingWindowRateLimiter {
    windows: DashMap<(String, String), VecDeque<Instant>>,
    max_calls: u32,
    window: Duration,
}

impl SlidingWindowRateLimiter {
    pub fn new(max_calls: u32, window_secs: u64) -> Self {
        Self {
            windows: DashMap::new(),
            max_calls,
            window: Duration::from_secs(window_secs),
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowRateLimiter {
    async fn check(&self, client_id: &str, endpoint: &str) -> Result<()> {
        let key = (client_id.to_string(), endpoint.to_string());
        let now = Instant::now();
        let mut entry = self.windows.entry(key).or_default();

        while let Some(oldest) = entry.front() {
            if now.duration_since(*oldest) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() as u32 >= self.max_calls {
            return Err(Error::RateLimitExceeded {
                client_id: client_id.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        entry.push_back(now);
        Ok(())
    }
}

/// Always allows. Used when `limits.rate_limit_enabled = false`.
#[derive(Debug, Default)]
pub struct NoopRateLimiter;

#[async_trait]
impl RateLimiter for NoopRateLimiter {
    async fn check(&self, _client_id: &str, _endpoint: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_calls_under_the_limit() {
        let limiter = SlidingWindowRateLimiter::new(2, 60);
        assert!(limiter.check("client-a", "genesis").await.is_ok());
        assert!(limiter.check("client-a", "genesis").await.is_ok());
    }

    #[tokio::test]
    async fn denies_calls_over_the_limit() {
        let limiter = SlidingWindowRateLimiter::new(1, 60);
        assert!(limiter.check("client-a", "genesis").await.is_ok());
        assert!(limiter.check("client-a", "genesis").await.is_err());
    }

    #[tokio::test]
    async fn tracks_endpoints_independently() {
        let limiter = SlidingWindowRateLimiter::new(1, 60);
        assert!(limiter.check("client-a", "genesis").await.is_ok());
        assert!(limiter.check("client-a", "search_states").await.is_ok());
    }
}
