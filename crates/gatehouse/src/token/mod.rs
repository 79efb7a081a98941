//! Stateless bearer tokens and server-side revocation.
//!
//! Tokens are self-contained signed claims; the server keeps no record of a
//! live token. Revocation therefore works the other way around: a denylist
//! of token digests for individual revocations, plus a per-subject issuance
//! cutover for "kill every session" events like password changes.

mod issuer;
mod registry;

pub use issuer::{Claims, TokenError, TokenIssuer};
pub use registry::RevocationRegistry;

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of a full token.
///
/// The registry stores and matches digests only; raw tokens never reach
/// storage or logs.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
