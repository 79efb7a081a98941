//! Login-path defense gates: origin throttling and identity lockout.

mod lockout;
mod rate_limit;

pub use lockout::LockoutGate;
pub use rate_limit::RateLimiter;

use std::sync::Arc;

use hearth_common::GateError;

/// Combined pre-credential checks for the login path.
pub struct DefenseGate {
    pub rate_limiter: Arc<RateLimiter>,
    pub lockout: Arc<LockoutGate>,
}

impl DefenseGate {
    pub fn new(rate_limiter: Arc<RateLimiter>, lockout: Arc<LockoutGate>) -> Self {
        Self {
            rate_limiter,
            lockout,
        }
    }

    /// Reject a login before credentials are even looked at.
    ///
    /// Origin throttling runs before the identity lockout check so a flood
    /// from one origin cannot probe the lockout state of arbitrary
    /// identities.
    pub async fn validate_login_allowed(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        identity: &str,
        origin: &str,
    ) -> Result<(), GateError> {
        let limited = self
            .rate_limiter
            .is_rate_limited(redis, origin)
            .await
            .map_err(|err| GateError::Storage(err.to_string()))?;
        if limited {
            tracing::warn!(origin = %origin, "Login denied: origin over budget");
            return Err(GateError::RateLimited(
                "Too many requests, please try again later".to_string(),
            ));
        }

        let locked = self
            .lockout
            .is_locked(redis, identity)
            .await
            .map_err(|err| GateError::Storage(err.to_string()))?;
        if locked {
            tracing::warn!(identity = %identity, "Login denied: account locked");
            return Err(GateError::AccountLocked(
                "Account temporarily locked, please try again in 30 minutes".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AttemptLedger;
    use crate::test_support::{test_redis, unique};

    fn build_gate(ledger: Arc<AttemptLedger>, budget: u64) -> DefenseGate {
        let rate_limiter = Arc::new(RateLimiter::new(budget, 60, ledger.clone()));
        let lockout = Arc::new(LockoutGate::new(5, 900, 1800, ledger));
        DefenseGate::new(rate_limiter, lockout)
    }

    #[tokio::test]
    async fn throttling_is_reported_before_lockout() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = Arc::new(AttemptLedger::new(86_400));
        let gate = build_gate(ledger.clone(), 1);
        let phone = unique("13800000000");
        let origin = unique("10.0.0.5");
        let now = chrono::Utc::now().timestamp_millis();

        // Both defenses would deny; the origin one must win
        for _ in 0..5 {
            ledger
                .record_login_attempt_at(&mut redis, &phone, &origin, false, now)
                .await
                .unwrap();
            ledger
                .record_origin_request_at(&mut redis, &origin, "/api/auth/login", now)
                .await
                .unwrap();
        }

        let err = gate
            .validate_login_allowed(&mut redis, &phone, &origin)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::RateLimited(_)));
    }

    #[tokio::test]
    async fn locked_identity_is_rejected() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = Arc::new(AttemptLedger::new(86_400));
        let gate = build_gate(ledger.clone(), 100);
        let phone = unique("13800000000");
        let origin = unique("10.0.0.5");
        let now = chrono::Utc::now().timestamp_millis();

        for _ in 0..5 {
            ledger
                .record_login_attempt_at(&mut redis, &phone, &origin, false, now)
                .await
                .unwrap();
        }

        let err = gate
            .validate_login_allowed(&mut redis, &phone, &origin)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::AccountLocked(_)));
    }

    #[tokio::test]
    async fn clean_identity_and_origin_pass() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let ledger = Arc::new(AttemptLedger::new(86_400));
        let gate = build_gate(ledger, 100);
        let phone = unique("13800000000");
        let origin = unique("10.0.0.5");

        assert!(
            gate.validate_login_allowed(&mut redis, &phone, &origin)
                .await
                .is_ok()
        );
    }
}
