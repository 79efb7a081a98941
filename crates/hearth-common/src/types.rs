//! Core types shared across Hearth services.

use serde::{Deserialize, Serialize};

/// A freshly issued captcha challenge, as sent to the client.
///
/// The code itself never leaves the server; the client gets the opaque
/// handle plus the rendered image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    /// Opaque one-time handle identifying the stored challenge
    pub captcha_key: String,

    /// Rendered challenge as a `data:image/png;base64,...` URI
    pub captcha_image: String,

    /// Challenge expiry timestamp (Unix epoch seconds)
    pub expires_at: i64,
}

/// Outcome recorded for a single ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// Login attempt that passed credential comparison
    Success,
    /// Login attempt rejected anywhere past the defense gate
    Failure,
    /// Plain inbound request, counted for origin throttling
    Request,
}

/// One immutable row of the attempt ledger.
///
/// Login attempts populate `identity`; generic per-origin traffic leaves it
/// empty and carries the request path instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Phone number for login attempts, None for origin traffic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Client network origin (IP address)
    pub origin: String,

    /// What happened
    pub outcome: AttemptOutcome,

    /// Request path, for origin traffic rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Insert timestamp (Unix epoch milliseconds)
    pub at_ms: i64,

    /// Uniqueness nonce (sorted-set members must not collide)
    pub nonce: String,
}

/// A denylisted token digest and its bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    /// SHA-256 hex digest of the full token; the raw token is never stored
    pub digest: String,

    /// Subject (user id) the token belonged to
    pub subject_id: String,

    /// Why it was revoked ("logout", "password change", ...)
    pub reason: String,

    /// The token's own expiry (Unix epoch seconds); rows past this are swept
    pub token_expires_at: i64,

    /// When the revocation was recorded (Unix epoch seconds)
    pub revoked_at: i64,
}

impl RevokedToken {
    /// Whether the underlying token has outlived its own expiry; rows for
    /// such tokens carry no information and are safe to discard.
    pub fn token_expired(&self) -> bool {
        chrono::Utc::now().timestamp() >= self.token_expires_at
    }
}

/// Per-subject bulk-revocation marker.
///
/// Any token whose `iat` predates `cutover_at` is treated as revoked. This
/// covers every token the subject could be holding without enumerating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationCutover {
    /// Tokens issued strictly before this instant are void (epoch seconds)
    pub cutover_at: i64,

    /// Why the cutover was recorded
    pub reason: String,

    /// When the cutover was recorded (epoch seconds)
    pub revoked_at: i64,
}

/// Successful-login response: the bearer token plus identity claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub user_id: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Public view of a user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Unix epoch seconds
    pub created_at: i64,
}
