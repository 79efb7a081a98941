//! Shared constants for Hearth services.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Gatehouse HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Captcha code length
pub const CAPTCHA_CODE_LENGTH: usize = 4;

/// Captcha alphabet; excludes visually ambiguous characters (0/O, 1/I/L)
pub const CAPTCHA_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Captcha challenge validity (5 minutes)
pub const CAPTCHA_TTL_SECS: u64 = 300;

/// Captcha sweep interval (10 minutes)
pub const CAPTCHA_SWEEP_INTERVAL_SECS: u64 = 600;

/// Failed login attempts before lockout
pub const MAX_FAILED_ATTEMPTS: u64 = 5;

/// Window over which login failures are counted (15 minutes)
pub const FAILURE_WINDOW_SECS: u64 = 900;

/// Lockout cooldown measured from the most recent failure (30 minutes)
pub const LOCKOUT_COOLDOWN_SECS: u64 = 1800;

/// Per-origin request budget per rolling minute
pub const MAX_REQUESTS_PER_MINUTE: u64 = 100;

/// Rolling window for origin throttling (1 minute)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Bearer token lifetime (24 hours)
pub const TOKEN_LIFETIME_SECS: u64 = 86_400;

/// Revocation registry sweep interval (1 hour)
pub const REVOCATION_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Ledger retention for attempt/traffic rows (24 hours)
pub const LEDGER_RETENTION_SECS: u64 = 86_400;

/// Ledger retention sweep interval (1 hour)
pub const LEDGER_SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Redis key prefixes
pub mod redis_keys {
    /// Captcha challenge: captcha:{handle}
    pub const CAPTCHA_PREFIX: &str = "captcha:";

    /// Full login-attempt stream: login:attempts:{identity}
    pub const LOGIN_ATTEMPTS_PREFIX: &str = "login:attempts:";

    /// Failure index: login:failures:{identity}
    pub const LOGIN_FAILURES_PREFIX: &str = "login:failures:";

    /// Per-origin traffic stream: origin:requests:{origin}
    pub const ORIGIN_REQUESTS_PREFIX: &str = "origin:requests:";

    /// Revoked token digest: token:revoked:{digest}
    pub const REVOKED_TOKEN_PREFIX: &str = "token:revoked:";

    /// Per-subject revocation cutover: token:cutover:{subject_id}
    pub const REVOCATION_CUTOVER_PREFIX: &str = "token:cutover:";

    /// User record: user:phone:{phone}
    pub const USER_PHONE_PREFIX: &str = "user:phone:";

    /// Phone index: user:id:{id}
    pub const USER_ID_PREFIX: &str = "user:id:";
}

/// HTTP header names
pub mod headers {
    /// Forwarded client address chain (first entry wins)
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";

    /// Single forwarded client address
    pub const X_REAL_IP: &str = "X-Real-IP";

    /// Bearer token transport
    pub const AUTHORIZATION: &str = "Authorization";
}
