//! Captcha verification logic.

use anyhow::Result;
use hearth_common::constants::redis_keys;
use redis::AsyncCommands;

use super::StoredChallenge;
use crate::storage::scan_keys;

/// Captcha verification service
#[derive(Default)]
pub struct CaptchaVerifier;

impl CaptchaVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify a submitted code against its handle.
    ///
    /// The stored challenge is deleted whether or not verification succeeds,
    /// so a handle can never be checked twice. An unknown handle is just
    /// "not verified", never an error.
    pub async fn verify(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        captcha_key: &str,
        submitted: &str,
    ) -> Result<bool> {
        if captcha_key.is_empty() || submitted.is_empty() {
            return Ok(false);
        }

        let key = format!("{}{}", redis_keys::CAPTCHA_PREFIX, captcha_key);

        // Fetch and delete challenge (single-use)
        // Use GET + DEL for Redis 3.x compatibility (GETDEL requires Redis 6.2+)
        let stored: Option<String> = redis.get(&key).await?;
        let _: () = redis.del(&key).await?;

        let Some(stored) = stored else {
            tracing::debug!(captcha_key = %captcha_key, "Unknown or already-consumed captcha handle");
            return Ok(false);
        };

        let challenge: StoredChallenge = serde_json::from_str(&stored)?;

        if chrono::Utc::now().timestamp() > challenge.expires_at {
            tracing::debug!(captcha_key = %captcha_key, "Captcha challenge expired");
            return Ok(false);
        }

        Ok(challenge.code.eq_ignore_ascii_case(submitted))
    }

    /// Delete challenges past expiry that were never redeemed.
    ///
    /// Redis already expires challenge keys on its own; this sweep is the
    /// safety net for records stored with a longer TTL than their logical
    /// expiry.
    pub async fn sweep_expired(&self, redis: &mut redis::aio::ConnectionManager) -> Result<u64> {
        let pattern = format!("{}*", redis_keys::CAPTCHA_PREFIX);
        let keys = scan_keys(redis, &pattern).await?;
        let now = chrono::Utc::now().timestamp();

        let mut deleted = 0u64;
        for key in keys {
            let raw: Option<String> = redis.get(&key).await?;
            let Some(raw) = raw else { continue };

            let dead = match serde_json::from_str::<StoredChallenge>(&raw) {
                Ok(challenge) => challenge.expires_at <= now,
                // Unparseable rows can never verify; drop them too
                Err(_) => true,
            };

            if dead {
                let _: () = redis.del(&key).await?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_redis, unique};
    use redis::AsyncCommands;

    async fn store_challenge(
        redis: &mut redis::aio::ConnectionManager,
        captcha_key: &str,
        code: &str,
        expires_in_secs: i64,
    ) {
        let now = chrono::Utc::now().timestamp();
        let stored = StoredChallenge {
            code: code.to_string(),
            created_at: now,
            expires_at: now + expires_in_secs,
        };
        let key = format!("{}{}", redis_keys::CAPTCHA_PREFIX, captcha_key);
        let _: () = redis
            .set(&key, serde_json::to_string(&stored).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_is_case_insensitive_and_single_use() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let verifier = CaptchaVerifier::new();

        let handle = unique("captcha");
        store_challenge(&mut redis, &handle, "7F3K", 300).await;

        assert!(verifier.verify(&mut redis, &handle, "7f3k").await.unwrap());
        // Consumed on first check, even though it succeeded
        assert!(!verifier.verify(&mut redis, &handle, "7F3K").await.unwrap());
    }

    #[tokio::test]
    async fn failed_verify_still_consumes_the_challenge() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let verifier = CaptchaVerifier::new();

        let handle = unique("captcha");
        store_challenge(&mut redis, &handle, "ABCD", 300).await;

        assert!(!verifier.verify(&mut redis, &handle, "WXYZ").await.unwrap());
        // The right code no longer helps
        assert!(!verifier.verify(&mut redis, &handle, "ABCD").await.unwrap());
    }

    #[tokio::test]
    async fn expired_challenge_never_verifies() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let verifier = CaptchaVerifier::new();

        let handle = unique("captcha");
        store_challenge(&mut redis, &handle, "ABCD", -10).await;

        assert!(!verifier.verify(&mut redis, &handle, "ABCD").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_handle_is_not_an_error() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let verifier = CaptchaVerifier::new();

        let handle = unique("captcha-missing");
        assert!(!verifier.verify(&mut redis, &handle, "ABCD").await.unwrap());
        assert!(!verifier.verify(&mut redis, "", "ABCD").await.unwrap());
        assert!(!verifier.verify(&mut redis, &handle, "").await.unwrap());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_challenges() {
        let Some(mut redis) = test_redis().await else {
            return;
        };
        let verifier = CaptchaVerifier::new();

        let dead = unique("captcha");
        let live = unique("captcha");
        store_challenge(&mut redis, &dead, "ABCD", -10).await;
        store_challenge(&mut redis, &live, "EFGH", 300).await;

        let deleted = verifier.sweep_expired(&mut redis).await.unwrap();
        assert!(deleted >= 1);

        let dead_key = format!("{}{}", redis_keys::CAPTCHA_PREFIX, dead);
        let live_key = format!("{}{}", redis_keys::CAPTCHA_PREFIX, live);
        let dead_exists: bool = redis.exists(&dead_key).await.unwrap();
        let live_exists: bool = redis.exists(&live_key).await.unwrap();
        assert!(!dead_exists);
        assert!(live_exists);

        let _: () = redis.del(&live_key).await.unwrap();
    }
}
