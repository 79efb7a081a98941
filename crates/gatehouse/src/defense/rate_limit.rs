//! Per-origin request throttling.

use anyhow::Result;
use std::sync::Arc;

use crate::ledger::AttemptLedger;

/// Sliding-window origin throttle.
///
/// Each origin gets its own budget; there is no global budget. The window
/// always ends at the present moment rather than snapping to a calendar
/// minute.
pub struct RateLimiter {
    /// Requests allowed per rolling window
    max_requests: u64,
    /// Window length in seconds
    window_secs: u64,
    ledger: Arc<AttemptLedger>,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window_secs: u64, ledger: Arc<AttemptLedger>) -> Self {
        Self {
            max_requests,
            window_secs,
            ledger,
        }
    }

    /// Whether `origin` has spent its budget for the current window.
    ///
    /// Callers record the current request before asking, so the request that
    /// reaches the budget is itself the first one denied.
    pub async fn is_rate_limited(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        origin: &str,
    ) -> Result<bool> {
        let since_ms =
            chrono::Utc::now().timestamp_millis() - (self.window_secs as i64) * 1000;
        let requests = self
            .ledger
            .count_origin_requests_since(redis, origin, since_ms)
            .await?;
        Ok(requests >= self.max_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_redis, unique};

    #[tokio::test]
    async fn budget_boundary_denies_the_tipping_request() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = Arc::new(AttemptLedger::new(86_400));
        let limiter = RateLimiter::new(100, 60, ledger.clone());
        let origin = unique("10.0.0.5");
        let now = chrono::Utc::now().timestamp_millis();

        for _ in 0..99 {
            ledger
                .record_origin_request_at(&mut redis, &origin, "/api/auth/login", now)
                .await
                .unwrap();
        }
        // Request #99 recorded: still under budget
        assert!(!limiter.is_rate_limited(&mut redis, &origin).await.unwrap());

        ledger
            .record_origin_request_at(&mut redis, &origin, "/api/auth/login", now)
            .await
            .unwrap();
        // Request #100 recorded: the count reaches the budget and this very
        // request is denied
        assert!(limiter.is_rate_limited(&mut redis, &origin).await.unwrap());
    }

    #[tokio::test]
    async fn requests_outside_the_window_do_not_count() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = Arc::new(AttemptLedger::new(86_400));
        let limiter = RateLimiter::new(3, 60, ledger.clone());
        let origin = unique("10.0.0.5");
        let now = chrono::Utc::now().timestamp_millis();

        for _ in 0..3 {
            ledger
                .record_origin_request_at(&mut redis, &origin, "/", now - 61_000)
                .await
                .unwrap();
        }
        assert!(!limiter.is_rate_limited(&mut redis, &origin).await.unwrap());

        for _ in 0..3 {
            ledger
                .record_origin_request_at(&mut redis, &origin, "/", now)
                .await
                .unwrap();
        }
        assert!(limiter.is_rate_limited(&mut redis, &origin).await.unwrap());
    }

    #[tokio::test]
    async fn origins_are_throttled_independently() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = Arc::new(AttemptLedger::new(86_400));
        let limiter = RateLimiter::new(2, 60, ledger.clone());
        let noisy = unique("10.0.0.5");
        let quiet = unique("10.0.0.6");
        let now = chrono::Utc::now().timestamp_millis();

        for _ in 0..5 {
            ledger
                .record_origin_request_at(&mut redis, &noisy, "/", now)
                .await
                .unwrap();
        }

        assert!(limiter.is_rate_limited(&mut redis, &noisy).await.unwrap());
        assert!(!limiter.is_rate_limited(&mut redis, &quiet).await.unwrap());
    }
}
