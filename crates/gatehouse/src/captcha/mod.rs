//! Captcha challenge issuance and verification.

mod generator;
mod render;
mod verifier;

pub use generator::CaptchaIssuer;
pub use render::CaptchaRenderer;
pub use verifier::CaptchaVerifier;

use serde::{Deserialize, Serialize};

/// Stored challenge data in Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChallenge {
    /// The expected code
    pub code: String,
    /// Creation timestamp (epoch seconds)
    pub created_at: i64,
    /// Expiry timestamp (epoch seconds)
    pub expires_at: i64,
}
