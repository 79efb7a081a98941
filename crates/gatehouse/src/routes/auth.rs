//! Authentication endpoints: captcha, registration, login, logout,
//! password change.

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use hearth_common::{CaptchaChallenge, GateError, TokenGrant, UserProfile};

use super::{ApiError, AuthUser, client_origin};
use crate::state::AppState;

#[derive(Serialize)]
pub struct MessageResponse {
    message: String,
}

/// Issue a fresh captcha challenge
pub async fn get_captcha(
    State(state): State<AppState>,
) -> Result<Json<CaptchaChallenge>, ApiError> {
    let mut redis = state.redis.clone();
    let challenge = state.captcha_issuer.issue(&mut redis).await?;
    Ok(Json(challenge))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    phone: String,
    password: String,
    nickname: Option<String>,
    captcha_key: String,
    captcha_code: String,
}

/// Captcha-gated registration
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let mut redis = state.redis.clone();

    let passed = state
        .captcha_verifier
        .verify(&mut redis, &payload.captcha_key, &payload.captcha_code)
        .await?;
    if !passed {
        return Err(GateError::CaptchaRejected("Captcha incorrect or expired".to_string()).into());
    }

    if payload.phone.is_empty() || payload.password.is_empty() {
        return Err(GateError::InvalidInput("Phone and password are required".to_string()).into());
    }

    let user = state
        .users
        .create(&mut redis, &payload.phone, &payload.password, payload.nickname)
        .await?;

    Ok(Json(user.profile()))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    phone: String,
    password: String,
    captcha_key: String,
    captcha_code: String,
}

/// Credential login behind the full defense chain.
///
/// Check order matters: origin throttle, identity lockout, captcha burn,
/// then credentials. Every rejection past the defense gate lands in the
/// attempt ledger as a failure.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    header_map: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenGrant>, ApiError> {
    let origin = client_origin(&header_map, peer);
    let mut redis = state.redis.clone();

    state
        .defense
        .validate_login_allowed(&mut redis, &payload.phone, &origin)
        .await?;

    let captcha_ok = state
        .captcha_verifier
        .verify(&mut redis, &payload.captcha_key, &payload.captcha_code)
        .await?;
    if !captcha_ok {
        state
            .ledger
            .record_login_attempt(&mut redis, &payload.phone, &origin, false)
            .await?;
        return Err(GateError::CaptchaRejected("Captcha incorrect or expired".to_string()).into());
    }

    let user = match state.users.find_by_phone(&mut redis, &payload.phone).await? {
        Some(user) if state.users.verify_password(&user, &payload.password) => user,
        // Unknown phone and wrong password are indistinguishable on purpose
        _ => {
            state
                .ledger
                .record_login_attempt(&mut redis, &payload.phone, &origin, false)
                .await?;
            return Err(
                GateError::InvalidCredentials("Phone or password incorrect".to_string()).into(),
            );
        }
    };

    state
        .ledger
        .record_login_attempt(&mut redis, &payload.phone, &origin, true)
        .await?;

    let token = state.tokens.issue(&user.id, &user.phone)?;

    tracing::info!(user_id = %user.id, origin = %origin, "Login succeeded");

    Ok(Json(TokenGrant {
        token,
        user_id: user.id,
        phone: user.phone,
        nickname: user.nickname,
    }))
}

/// Current user's profile
pub async fn user_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let mut redis = state.redis.clone();
    let record = state
        .users
        .find_by_id(&mut redis, &user.claims.sub)
        .await?
        .ok_or_else(|| GateError::Unauthorized("Unknown subject".to_string()))?;
    Ok(Json(record.profile()))
}

/// Revoke the presented token.
///
/// Never fails from the client's perspective; the client drops the token
/// either way, and a missed denylist entry only matters until expiry.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut redis = state.redis.clone();

    if let Err(err) = state
        .revocations
        .revoke(&mut redis, &user.token, &user.claims, "logout")
        .await
    {
        tracing::warn!(
            error = %err,
            user_id = %user.claims.sub,
            "Failed to denylist token on logout"
        );
    }

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    old_password: String,
    new_password: String,
}

/// Change the password, then void every session the subject holds.
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PasswordChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut redis = state.redis.clone();

    let record = state
        .users
        .find_by_id(&mut redis, &user.claims.sub)
        .await?
        .ok_or_else(|| GateError::Unauthorized("Unknown subject".to_string()))?;

    if !state.users.verify_password(&record, &payload.old_password) {
        return Err(GateError::InvalidCredentials("Old password incorrect".to_string()).into());
    }
    if payload.new_password.is_empty() {
        return Err(GateError::InvalidInput("New password is required".to_string()).into());
    }

    state
        .users
        .change_password(&mut redis, &record, &payload.new_password)
        .await?;

    // Every previously issued token for this subject dies here, including
    // the one that authorized this request
    state
        .revocations
        .revoke_all_for_subject(&mut redis, &record.id, "password change")
        .await
        .map_err(|err| GateError::Storage(err.to_string()))?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}
