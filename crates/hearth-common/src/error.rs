//! Common error types for Hearth services.

use thiserror::Error;

/// Errors surfaced by the authentication-defense core.
///
/// Policy denials (rate limit, lockout, captcha, credentials) carry a
/// human-readable reason but deliberately nothing that identifies which
/// defense tripped beyond what the client needs.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage (Redis) connection/operation error
    #[error("Storage error: {0}")]
    Storage(String),

    /// CAPTCHA generation/rendering error
    #[error("Captcha error: {0}")]
    Captcha(String),

    /// Submitted captcha did not verify
    #[error("{0}")]
    CaptchaRejected(String),

    /// Origin exceeded its request budget
    #[error("{0}")]
    RateLimited(String),

    /// Identity is locked out after repeated failures
    #[error("{0}")]
    AccountLocked(String),

    /// Credentials did not match
    #[error("{0}")]
    InvalidCredentials(String),

    /// Missing, malformed, expired, or revoked bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Storage(_) => 503,
            Self::Captcha(_) => 500,
            Self::CaptchaRejected(_) => 400,
            Self::RateLimited(_) => 429,
            Self::AccountLocked(_) => 423,
            Self::InvalidCredentials(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this is a policy denial rather than a fault
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::CaptchaRejected(_)
                | Self::RateLimited(_)
                | Self::AccountLocked(_)
                | Self::InvalidCredentials(_)
                | Self::Unauthorized(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(GateError::RateLimited("slow down".into()).status_code(), 429);
        assert_eq!(GateError::AccountLocked("locked".into()).status_code(), 423);
        assert_eq!(GateError::Unauthorized("no token".into()).status_code(), 401);
        assert_eq!(GateError::CaptchaRejected("wrong".into()).status_code(), 400);
        assert_eq!(GateError::Storage("down".into()).status_code(), 503);
    }

    #[test]
    fn denials_are_denials() {
        assert!(GateError::RateLimited("x".into()).is_denial());
        assert!(GateError::InvalidCredentials("x".into()).is_denial());
        assert!(!GateError::Storage("x".into()).is_denial());
        assert!(!GateError::Internal("x".into()).is_denial());
    }
}
