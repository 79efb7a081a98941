//! HTTP route handlers for Gatehouse.

use axum::{
    Json, Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use hearth_common::GateError;
use hearth_common::constants::headers;

use crate::state::AppState;

mod auth;
mod guard;
mod health;

pub use guard::AuthUser;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/captcha", get(auth::get_captcha))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/info", get(auth::user_info))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            throttle_origin,
        ));

    Router::new()
        // Health probes bypass origin throttling
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Record the request against its origin, then decide.
///
/// Recording happens before the count so the request that reaches the budget
/// is itself denied, not the one after it.
async fn throttle_origin(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let origin = client_origin(request.headers(), peer);
    let path = request.uri().path().to_string();
    let mut redis = state.redis.clone();

    if let Err(err) = state
        .ledger
        .record_origin_request(&mut redis, &origin, &path)
        .await
    {
        tracing::error!(error = %err, "Failed to record origin request");
        return ApiError(GateError::Storage(err.to_string())).into_response();
    }

    match state
        .defense
        .rate_limiter
        .is_rate_limited(&mut redis, &origin)
        .await
    {
        Ok(false) => next.run(request).await,
        Ok(true) => {
            tracing::warn!(origin = %origin, path = %path, "Origin over request budget");
            ApiError(GateError::RateLimited(
                "Too many requests, please try again later".to_string(),
            ))
            .into_response()
        }
        Err(err) => ApiError(GateError::Storage(err.to_string())).into_response(),
    }
}

/// Resolve the client origin: first X-Forwarded-For entry, then X-Real-IP,
/// then the socket peer.
pub(crate) fn client_origin(header_map: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = header_map
        .get(headers::X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() && !first.eq_ignore_ascii_case("unknown") {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = header_map
        .get(headers::X_REAL_IP)
        .and_then(|value| value.to_str().ok())
    {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() && !real_ip.eq_ignore_ascii_case("unknown") {
            return real_ip.to_string();
        }
    }

    peer.ip().to_string()
}

/// JSON error envelope around the shared taxonomy.
pub struct ApiError(pub GateError);

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(GateError::Internal(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            code: status.as_u16(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.1:4000".parse().unwrap()
    }

    #[test]
    fn forwarded_for_takes_the_first_entry() {
        let mut header_map = HeaderMap::new();
        header_map.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.5, 172.16.0.1"),
        );
        header_map.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));

        assert_eq!(client_origin(&header_map, peer()), "10.0.0.5");
    }

    #[test]
    fn real_ip_wins_over_the_peer() {
        let mut header_map = HeaderMap::new();
        header_map.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));

        assert_eq!(client_origin(&header_map, peer()), "10.9.9.9");
    }

    #[test]
    fn unknown_placeholders_fall_through_to_the_peer() {
        let mut header_map = HeaderMap::new();
        header_map.insert("x-forwarded-for", HeaderValue::from_static("unknown"));

        assert_eq!(client_origin(&header_map, peer()), "192.0.2.1");
    }
}
