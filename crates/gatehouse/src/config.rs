//! Configuration management for Gatehouse.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use hearth_common::constants::{self, DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Captcha configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Lockout and throttling configuration
    #[serde(default)]
    pub defense: DefenseConfig,

    /// Token configuration
    #[serde(default)]
    pub token: TokenConfig,
}

/// Captcha-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Path to font file for captcha text
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// Challenge validity in seconds
    #[serde(default = "default_challenge_ttl")]
    pub challenge_ttl_secs: u64,

    /// Expired-challenge sweep interval in seconds
    #[serde(default = "default_captcha_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            challenge_ttl_secs: default_challenge_ttl(),
            sweep_interval_secs: default_captcha_sweep_interval(),
        }
    }
}

/// Lockout and rate-limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DefenseConfig {
    /// Failed login attempts before lockout
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u64,

    /// Rolling window over which failures are counted, in seconds
    #[serde(default = "default_failure_window")]
    pub failure_window_secs: u64,

    /// Lockout cooldown from the most recent failure, in seconds
    #[serde(default = "default_lockout_cooldown")]
    pub lockout_cooldown_secs: u64,

    /// Per-origin request budget per rolling window
    #[serde(default = "default_max_requests")]
    pub max_requests_per_minute: u64,

    /// Rolling window for origin throttling, in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,

    /// How long attempt/traffic rows are retained, in seconds
    #[serde(default = "default_ledger_retention")]
    pub ledger_retention_secs: u64,

    /// Ledger retention sweep interval in seconds
    #[serde(default = "default_ledger_sweep_interval")]
    pub ledger_sweep_interval_secs: u64,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            failure_window_secs: default_failure_window(),
            lockout_cooldown_secs: default_lockout_cooldown(),
            max_requests_per_minute: default_max_requests(),
            rate_limit_window_secs: default_rate_limit_window(),
            ledger_retention_secs: default_ledger_retention(),
            ledger_sweep_interval_secs: default_ledger_sweep_interval(),
        }
    }
}

/// Bearer-token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// HS512 signing secret; usually supplied via --jwt-secret / JWT_SECRET
    #[serde(default)]
    pub secret: String,

    /// Token lifetime in seconds
    #[serde(default = "default_token_lifetime")]
    pub lifetime_secs: u64,

    /// Revocation registry sweep interval in seconds
    #[serde(default = "default_revocation_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            lifetime_secs: default_token_lifetime(),
            sweep_interval_secs: default_revocation_sweep_interval(),
        }
    }
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_font_path() -> String { "assets/fonts/DejaVuSans.ttf".to_string() }
fn default_challenge_ttl() -> u64 { constants::CAPTCHA_TTL_SECS }
fn default_captcha_sweep_interval() -> u64 { constants::CAPTCHA_SWEEP_INTERVAL_SECS }
fn default_max_failed_attempts() -> u64 { constants::MAX_FAILED_ATTEMPTS }
fn default_failure_window() -> u64 { constants::FAILURE_WINDOW_SECS }
fn default_lockout_cooldown() -> u64 { constants::LOCKOUT_COOLDOWN_SECS }
fn default_max_requests() -> u64 { constants::MAX_REQUESTS_PER_MINUTE }
fn default_rate_limit_window() -> u64 { constants::RATE_LIMIT_WINDOW_SECS }
fn default_ledger_retention() -> u64 { constants::LEDGER_RETENTION_SECS }
fn default_ledger_sweep_interval() -> u64 { constants::LEDGER_SWEEP_INTERVAL_SECS }
fn default_token_lifetime() -> u64 { constants::TOKEN_LIFETIME_SECS }
fn default_revocation_sweep_interval() -> u64 { constants::REVOCATION_SWEEP_INTERVAL_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref secret) = args.jwt_secret {
            config.token.secret = secret.clone();
        }

        config.validate()?;

        Ok(config)
    }

    /// A missing signing secret is an infrastructure failure, not something
    /// to limp along without.
    fn validate(&self) -> Result<()> {
        if self.token.secret.is_empty() {
            anyhow::bail!("JWT signing secret is not configured (set JWT_SECRET or token.secret)");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            captcha: CaptchaConfig::default(),
            defense: DefenseConfig::default(),
            token: TokenConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_policy_constants() {
        let config = AppConfig::default();
        assert_eq!(config.defense.max_failed_attempts, 5);
        assert_eq!(config.defense.failure_window_secs, 900);
        assert_eq!(config.defense.lockout_cooldown_secs, 1800);
        assert_eq!(config.defense.max_requests_per_minute, 100);
        assert_eq!(config.captcha.challenge_ttl_secs, 300);
        assert_eq!(config.token.lifetime_secs, 86_400);
    }

    #[test]
    fn empty_secret_fails_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.token.secret = "test-secret".to_string();
        assert!(config.validate().is_ok());
    }
}
