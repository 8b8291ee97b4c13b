//! Observability for the authorization pipeline.
//!
//! Diagnostic events use `tracing` with `authz.*` targets. Tokens and key
//! material are never recorded; subjects appear only as a correlation hash
//! produced by [`hash_for_correlation`].

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// Not a secret-protection mechanism. It keeps raw subjects and emails out of
/// diagnostic logs while still letting one request be followed across events.
#[must_use]
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Key, token-name, source or rule configuration was rejected.
    Configuration,
    /// No token, invalid token, or source address failure.
    Authentication,
    /// Policy denied a valid identity.
    Authorization,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
        }
    }
}
