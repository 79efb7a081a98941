//! Application state and shared resources.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use std::sync::Arc;

use crate::captcha::{CaptchaIssuer, CaptchaRenderer, CaptchaVerifier};
use crate::config::AppConfig;
use crate::defense::{DefenseGate, LockoutGate, RateLimiter};
use crate::ledger::AttemptLedger;
use crate::token::{RevocationRegistry, TokenIssuer};
use crate::users::UserDirectory;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Redis connection manager (auto-reconnecting)
    pub redis: ConnectionManager,

    /// Captcha issuance
    pub captcha_issuer: Arc<CaptchaIssuer>,

    /// Captcha verification and sweep
    pub captcha_verifier: Arc<CaptchaVerifier>,

    /// Attempt/traffic ledger
    pub ledger: Arc<AttemptLedger>,

    /// Combined login-path defenses
    pub defense: Arc<DefenseGate>,

    /// Bearer-token mint and validation
    pub tokens: Arc<TokenIssuer>,

    /// Token revocation registry
    pub revocations: Arc<RevocationRegistry>,

    /// Credential store
    pub users: Arc<UserDirectory>,
}

impl AppState {
    /// Create new application state, connecting to Redis and loading the
    /// captcha font. Either failure is fatal.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .context("Failed to create Redis client")?;

        let redis = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        let renderer = CaptchaRenderer::from_font_file(&config.captcha.font_path)?;
        let captcha_issuer = Arc::new(CaptchaIssuer::new(
            config.captcha.challenge_ttl_secs,
            renderer,
        ));
        let captcha_verifier = Arc::new(CaptchaVerifier::new());

        let ledger = Arc::new(AttemptLedger::new(config.defense.ledger_retention_secs));
        let lockout = Arc::new(LockoutGate::new(
            config.defense.max_failed_attempts,
            config.defense.failure_window_secs,
            config.defense.lockout_cooldown_secs,
            ledger.clone(),
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.defense.max_requests_per_minute,
            config.defense.rate_limit_window_secs,
            ledger.clone(),
        ));
        let defense = Arc::new(DefenseGate::new(rate_limiter, lockout));

        let tokens = Arc::new(TokenIssuer::new(
            &config.token.secret,
            config.token.lifetime_secs,
        ));
        let revocations = Arc::new(RevocationRegistry::new(config.token.lifetime_secs));
        let users = Arc::new(UserDirectory::new());

        Ok(Self {
            config,
            redis,
            captcha_issuer,
            captcha_verifier,
            ledger,
            defense,
            tokens,
            revocations,
            users,
        })
    }
}
