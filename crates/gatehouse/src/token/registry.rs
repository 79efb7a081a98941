//! Server-side token revocation registry.

use anyhow::{Context, Result};
use hearth_common::constants::redis_keys;
use hearth_common::{RevocationCutover, RevokedToken};
use redis::AsyncCommands;

use super::{Claims, token_digest};
use crate::storage::scan_keys;

/// Revocation registry service
pub struct RevocationRegistry {
    /// TTL for cutover records; must cover the longest outstanding token
    token_lifetime_secs: u64,
}

impl RevocationRegistry {
    pub fn new(token_lifetime_secs: u64) -> Self {
        Self { token_lifetime_secs }
    }

    /// Denylist a single token until its natural expiry.
    ///
    /// Callers pass the already-decoded claims; a token that cannot be
    /// decoded has nothing left to revoke.
    pub async fn revoke(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        token: &str,
        claims: &Claims,
        reason: &str,
    ) -> Result<()> {
        let digest = token_digest(token);
        let now = chrono::Utc::now().timestamp();

        let record = RevokedToken {
            digest: digest.clone(),
            subject_id: claims.sub.clone(),
            reason: reason.to_string(),
            token_expires_at: claims.exp,
            revoked_at: now,
        };

        // Once the token has expired on its own the row is pointless,
        // so the TTL tracks the token's remaining life
        let ttl = (claims.exp - now).max(1) as u64;

        let key = format!("{}{}", redis_keys::REVOKED_TOKEN_PREFIX, digest);
        let value = serde_json::to_string(&record)?;
        redis
            .set_ex::<_, _, ()>(&key, &value, ttl)
            .await
            .context("Failed to store revocation")?;

        tracing::info!(
            subject_id = %claims.sub,
            reason = %reason,
            token_expires_at = claims.exp,
            "Token revoked"
        );

        Ok(())
    }

    /// Void every token `subject_id` could be holding.
    ///
    /// Live tokens are not tracked individually, so this records an issuance
    /// cutover instead of enumerating digests: any token whose `iat`
    /// predates the cutover is treated as revoked.
    pub async fn revoke_all_for_subject(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        subject_id: &str,
        reason: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let record = RevocationCutover {
            cutover_at: now,
            reason: reason.to_string(),
            revoked_at: now,
        };

        let key = format!("{}{}", redis_keys::REVOCATION_CUTOVER_PREFIX, subject_id);
        let value = serde_json::to_string(&record)?;
        redis
            .set_ex::<_, _, ()>(&key, &value, self.token_lifetime_secs)
            .await
            .context("Failed to store revocation cutover")?;

        tracing::info!(
            subject_id = %subject_id,
            reason = %reason,
            "All outstanding tokens for subject revoked"
        );

        Ok(())
    }

    /// Whether a signature-valid token has been revoked, individually or via
    /// a subject-wide cutover.
    pub async fn is_revoked(
        &self,
        redis: &mut redis::aio::ConnectionManager,
        token: &str,
        claims: &Claims,
    ) -> Result<bool> {
        let key = format!("{}{}", redis_keys::REVOKED_TOKEN_PREFIX, token_digest(token));
        let denylisted: bool = redis
            .exists(&key)
            .await
            .context("Failed to check revocation registry")?;
        if denylisted {
            return Ok(true);
        }

        let cutover_key = format!("{}{}", redis_keys::REVOCATION_CUTOVER_PREFIX, claims.sub);
        let raw: Option<String> = redis
            .get(&cutover_key)
            .await
            .context("Failed to check revocation cutover")?;

        match raw {
            Some(raw) => {
                let cutover: RevocationCutover = serde_json::from_str(&raw)?;
                Ok(claims.iat < cutover.cutover_at)
            }
            None => Ok(false),
        }
    }

    /// Drop registry rows whose underlying token has expired anyway.
    ///
    /// An expired token already fails validation on expiry grounds, so the
    /// rows carry no information. Safety net beneath the per-row TTLs.
    pub async fn sweep_expired(&self, redis: &mut redis::aio::ConnectionManager) -> Result<u64> {
        let pattern = format!("{}*", redis_keys::REVOKED_TOKEN_PREFIX);
        let keys = scan_keys(redis, &pattern).await?;

        let mut deleted = 0u64;
        for key in keys {
            let raw: Option<String> = redis.get(&key).await?;
            let Some(raw) = raw else { continue };

            let dead = match serde_json::from_str::<RevokedToken>(&raw) {
                Ok(record) => record.token_expired(),
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
