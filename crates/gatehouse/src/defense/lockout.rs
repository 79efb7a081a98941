//! Identity lockout evaluation.

use anyhow::Result;
use std::sync::Arc;

use crate::ledger::AttemptLedger;

/// Lockout evaluation service.
///
/// State is never materialized; every check re-derives the answer from the
/// attempt ledger.
pub struct LockoutGate {
    /// Failed attempts before lockout
    max_failed_attempts: u64,
    /// Rolling window over which failures count, in seconds
    failure_window_secs: u64,
    /// Cooldown from the most recent failure, in seconds
    cooldown_secs: u64,
    ledger: Arc<AttemptLedger>,
}

impl LockoutGate {
    pub fn new(
        max_failed_attempts: u64,
        failure_window_secs: u64,
        cooldown_secs: u64,
        ledger: Arc<AttemptLedger>,
    ) -> Self {
        Self {
            max_failed_attempts,
            failure_window_secs,
            cooldown_secs,
            ledger,
        }
    }

    /// Whether `identity` is currently locked out.
    ///
    /// The failure window always ends at the present moment, and the
    /// cooldown is anchored to the most recent failure, so a failure landing
    /// during an active window pushes the unlock time out.
    pub async fn is_locked(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        identity: &str,
    ) -> Result<bool> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_start = now_ms - (self.failure_window_secs as i64) * 1000;

        let failures = self
            .ledger
            .count_failures_since(redis, identity, window_start)
            .await?;
        if failures < self.max_failed_attempts {
            return Ok(false);
        }

        // A missing last-failure timestamp contradicts the non-zero count;
        // fail open to unlocked rather than locking on inconsistent data.
        let Some(last_failure_ms) = self.ledger.last_failure_at(redis, identity).await? else {
            tracing::warn!(identity = %identity, "Failure count without a last-failure timestamp");
            return Ok(false);
        };

        let locked = now_ms < last_failure_ms + (self.cooldown_secs as i64) * 1000;
        if locked {
            tracing::debug!(identity = %identity, failures, "Identity is locked out");
        }
        Ok(locked)
    }
}
