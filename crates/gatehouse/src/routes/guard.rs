//! Bearer-token authorization guard.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use hearth_common::GateError;
use hearth_common::constants::headers;

use super::ApiError;
use crate::state::AppState;
use crate::token::Claims;

const BEARER_PREFIX: &str = "Bearer ";

/// An authenticated caller.
///
/// Extraction succeeds only when the token's signature and expiry check out
/// AND the revocation registry has nothing against it; neither check alone
/// is sufficient. A registry failure rejects the request; authorization
/// never fails open.
pub struct AuthUser {
    pub claims: Claims,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Err(GateError::Unauthorized("Missing bearer token".to_string()).into());
        };

        let claims = state
            .tokens
            .validate(&token)
            .map_err(|err| GateError::Unauthorized(err.to_string()))?;

        let mut redis = state.redis.clone();
        match state.revocations.is_revoked(&mut redis, &token, &claims).await {
            Ok(false) => Ok(AuthUser { claims, token }),
            Ok(true) => {
                tracing::debug!(user_id = %claims.sub, "Rejected revoked token");
                Err(GateError::Unauthorized("Token revoked".to_string()).into())
            }
            Err(err) => {
                tracing::error!(error = %err, "Revocation check failed, rejecting request");
                Err(GateError::Unauthorized("Authorization unavailable".to_string()).into())
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts
        .headers
        .get(headers::AUTHORIZATION)?
        .to_str()
        .ok()?;
    value
        .strip_prefix(BEARER_PREFIX)
        .map(|token| token.to_string())
}
