//! Append-only attempt ledger.
//!
//! Login attempts and per-origin traffic land here as immutable rows in
//! Redis sorted sets scored by insert time. Every count is re-derived from
//! the rows with a time-bounded query; nothing is cached in process memory,
//! so restarts and multiple instances see the same history.

use anyhow::Result;
use hearth_common::constants::redis_keys;
use hearth_common::{AttemptOutcome, AttemptRecord};
use redis::AsyncCommands;
use uuid::Uuid;

use crate::storage::scan_keys;

/// Attempt ledger service
pub struct AttemptLedger {
    /// How long rows are kept before the retention sweep trims them
    retention_secs: u64,
}

impl AttemptLedger {
    pub fn new(retention_secs: u64) -> Self {
        Self { retention_secs }
    }

    /// Append a login attempt for `identity`.
    pub async fn record_login_attempt(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        identity: &str,
        origin: &str,
        success: bool,
    ) -> Result<()> {
        let at_ms = chrono::Utc::now().timestamp_millis();
        self.record_login_attempt_at(redis, identity, origin, success, at_ms)
            .await
    }

    /// Insert path with an explicit timestamp; tests position the clock
    /// through this instead of sleeping.
    pub(crate) async fn record_login_attempt_at(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        identity: &str,
        origin: &str,
        success: bool,
        at_ms: i64,
    ) -> Result<()> {
        let outcome = if success {
            AttemptOutcome::Success
        } else {
            AttemptOutcome::Failure
        };
        let record = AttemptRecord {
            identity: Some(identity.to_string()),
            origin: origin.to_string(),
            outcome,
            path: None,
            at_ms,
            nonce: Uuid::new_v4().to_string(),
        };

        let key = format!("{}{}", redis_keys::LOGIN_ATTEMPTS_PREFIX, identity);
        let member = serde_json::to_string(&record)?;
        let _: () = redis.zadd(&key, member, at_ms).await?;
        let _: () = redis.expire(&key, self.retention_secs as i64).await?;

        if !success {
            // Failures get their own index so windowed counts are a single
            // ZCOUNT instead of a fetch-and-filter
            let fail_key = format!("{}{}", redis_keys::LOGIN_FAILURES_PREFIX, identity);
            let fail_member = format!("{}:{}", at_ms, record.nonce);
            let _: () = redis.zadd(&fail_key, fail_member, at_ms).await?;
            let _: () = redis.expire(&fail_key, self.retention_secs as i64).await?;
        }

        tracing::debug!(
            identity = %identity,
            origin = %origin,
            success,
            "Recorded login attempt"
        );

        Ok(())
    }

    /// Count login failures for `identity` stamped at or after `since_ms`
    /// (inclusive lower bound).
    pub async fn count_failures_since(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        identity: &str,
        since_ms: i64,
    ) -> Result<u64> {
        let key = format!("{}{}", redis_keys::LOGIN_FAILURES_PREFIX, identity);
        let count: u64 = redis.zcount(&key, since_ms, "+inf").await?;
        Ok(count)
    }

    /// Timestamp of the most recent failure for `identity`, if any.
    pub async fn last_failure_at(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        identity: &str,
    ) -> Result<Option<i64>> {
        let key = format!("{}{}", redis_keys::LOGIN_FAILURES_PREFIX, identity);
        let newest: Vec<(String, f64)> = redis.zrange_withscores(&key, -1, -1).await?;
        Ok(newest.first().map(|(_, score)| *score as i64))
    }

    /// Append a traffic row for `origin`.
    pub async fn record_origin_request(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        origin: &str,
        path: &str,
    ) -> Result<()> {
        let at_ms = chrono::Utc::now().timestamp_millis();
        self.record_origin_request_at(redis, origin, path, at_ms)
            .await
    }

    pub(crate) async fn record_origin_request_at(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        origin: &str,
        path: &str,
        at_ms: i64,
    ) -> Result<()> {
        let record = AttemptRecord {
            identity: None,
            origin: origin.to_string(),
            outcome: AttemptOutcome::Request,
            path: Some(path.to_string()),
            at_ms,
            nonce: Uuid::new_v4().to_string(),
        };

        let key = format!("{}{}", redis_keys::ORIGIN_REQUESTS_PREFIX, origin);
        let member = serde_json::to_string(&record)?;
        let _: () = redis.zadd(&key, member, at_ms).await?;
        let _: () = redis.expire(&key, self.retention_secs as i64).await?;

        Ok(())
    }

    /// Count requests from `origin` stamped at or after `since_ms`.
    pub async fn count_origin_requests_since(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        origin: &str,
        since_ms: i64,
    ) -> Result<u64> {
        let key = format!("{}{}", redis_keys::ORIGIN_REQUESTS_PREFIX, origin);
        let count: u64 = redis.zcount(&key, since_ms, "+inf").await?;
        Ok(count)
    }

    /// Trim rows older than the retention horizon.
    ///
    /// Storage hygiene only; no defense decision depends on rows that old.
    pub async fn sweep_retention(
        &self,
        redis: &mut redis::aio::ConnectionManager,
    ) -> Result<u64> {
        let horizon = chrono::Utc::now().timestamp_millis() - (self.retention_secs as i64) * 1000;

        let mut removed = 0u64;
        for prefix in [
            redis_keys::LOGIN_ATTEMPTS_PREFIX,
            redis_keys::LOGIN_FAILURES_PREFIX,
            redis_keys::ORIGIN_REQUESTS_PREFIX,
        ] {
            for key in scan_keys(redis, &format!("{prefix}*")).await? {
                let trimmed: u64 = redis.zrembyscore(&key, "-inf", horizon).await?;
                removed += trimmed;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_redis, unique};

    const MINUTE_MS: i64 = 60_000;

    #[tokio::test]
    async fn failure_counts_respect_the_window() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = AttemptLedger::new(86_400);
        let phone = unique("13800000000");
        let now = chrono::Utc::now().timestamp_millis();

        for minutes_ago in [20, 10, 5, 1] {
            ledger
                .record_login_attempt_at(
                    &mut redis,
                    &phone,
                    "10.0.0.5",
                    false,
                    now - minutes_ago * MINUTE_MS,
                )
                .await
                .unwrap();
        }
        // Successes never show up in the failure index
        ledger
            .record_login_attempt_at(&mut redis, &phone, "10.0.0.5", true, now)
            .await
            .unwrap();

        let in_window = ledger
            .count_failures_since(&mut redis, &phone, now - 15 * MINUTE_MS)
            .await
            .unwrap();
        assert_eq!(in_window, 3);

        let all = ledger
            .count_failures_since(&mut redis, &phone, now - 30 * MINUTE_MS)
            .await
            .unwrap();
        assert_eq!(all, 4);
    }

    #[tokio::test]
    async fn window_lower_bound_is_inclusive() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = AttemptLedger::new(86_400);
        let phone = unique("13800000001");
        let boundary = chrono::Utc::now().timestamp_millis() - 15 * MINUTE_MS;

        ledger
            .record_login_attempt_at(&mut redis, &phone, "10.0.0.5", false, boundary)
            .await
            .unwrap();

        let count = ledger
            .count_failures_since(&mut redis, &phone, boundary)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn last_failure_is_the_most_recent() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = AttemptLedger::new(86_400);
        let phone = unique("13800000002");
        let now = chrono::Utc::now().timestamp_millis();

        assert_eq!(
            ledger.last_failure_at(&mut redis, &phone).await.unwrap(),
            None
        );

        ledger
            .record_login_attempt_at(&mut redis, &phone, "10.0.0.5", false, now - 5 * MINUTE_MS)
            .await
            .unwrap();
        ledger
            .record_login_attempt_at(&mut redis, &phone, "10.0.0.5", false, now - MINUTE_MS)
            .await
            .unwrap();

        let last = ledger
            .last_failure_at(&mut redis, &phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last, now - MINUTE_MS);
    }

    #[tokio::test]
    async fn origin_streams_are_independent() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = AttemptLedger::new(86_400);
        let origin_a = unique("10.0.0.5");
        let origin_b = unique("10.0.0.6");
        let now = chrono::Utc::now().timestamp_millis();

        for _ in 0..3 {
            ledger
                .record_origin_request_at(&mut redis, &origin_a, "/api/auth/login", now)
                .await
                .unwrap();
        }
        ledger
            .record_origin_request_at(&mut redis, &origin_b, "/api/auth/login", now)
            .await
            .unwrap();

        let a = ledger
            .count_origin_requests_since(&mut redis, &origin_a, now - MINUTE_MS)
            .await
            .unwrap();
        let b = ledger
            .count_origin_requests_since(&mut redis, &origin_b, now - MINUTE_MS)
            .await
            .unwrap();
        assert_eq!(a, 3);
        assert_eq!(b, 1);
    }

    #[tokio::test]
    async fn retention_sweep_trims_old_rows() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = AttemptLedger::new(3600);
        let phone = unique("13800000003");
        let now = chrono::Utc::now().timestamp_millis();

        ledger
            .record_login_attempt_at(&mut redis, &phone, "10.0.0.5", false, now - 2 * 3600 * 1000)
            .await
            .unwrap();
        ledger
            .record_login_attempt_at(&mut redis, &phone, "10.0.0.5", false, now)
            .await
            .unwrap();

        let removed = ledger.sweep_retention(&mut redis).await.unwrap();
        assert!(removed >= 1);

        let remaining = ledger
            .count_failures_since(&mut redis, &phone, 0)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
