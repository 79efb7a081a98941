//! # Hearth Common
//!
//! Shared types, errors, and constants used across Hearth services.
//!
//! ## Modules
//! - `types` - Core data structures (CaptchaChallenge, AttemptRecord, etc.)
//! - `error` - Common error taxonomy
//! - `constants` - Shared thresholds, key prefixes, header names

pub mod constants;
pub mod error;
pub mod types;

pub use error::GateError;
pub use types::*;
