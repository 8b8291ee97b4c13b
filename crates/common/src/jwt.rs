//! JWT pre-parse utilities.
//!
//! Checks that run before any key is consulted:
//! - Size limit, so oversized input never reaches base64 or crypto code
//! - Header `alg` peek, so a verifier can skip keys of the wrong family
//! - `iat` validation with clock skew tolerance
//! - Ed25519 public key PEM decoding
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_alg, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let alg = extract_alg(token)?;
//! // ... pick keys whose verify methods contain `alg`, verify signature ...
//! validate_iat(iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted token size in bytes (8KB).
///
/// Tokens carrying an embedded path ACL are larger than plain service tokens,
/// but anything past 8KB is rejected before decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for the `iat` claim (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Upper bound for a configured clock skew (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the pre-parse checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token is not a three-part compact JWS, or its header is not base64url JSON.
    #[error("token is not a well-formed JWT: {0}")]
    MalformedToken(String),

    /// Header has no usable `alg` member.
    #[error("token header has no algorithm")]
    MissingAlg,

    /// `iat` is further in the future than the clock skew allows.
    #[error("token issued-at time is in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` when the limit is exceeded.
pub fn check_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Read the `alg` member of a JWT header without verifying anything.
///
/// The returned name is only a hint for key selection; the token must still
/// be verified with a key whose method set contains it.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds the size limit
/// - `MalformedToken` - wrong number of segments, bad base64, or bad JSON
/// - `MissingAlg` - header lacks a non-empty string `alg`
pub fn extract_alg(token: &str) -> Result<String, JwtValidationError> {
    check_size(token)?;

    let mut parts = token.split('.');
    let header_part = parts.next().unwrap_or_default();
    let segments = 1 + parts.count();
    if segments != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = segments,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken(format!(
            "expected 3 segments, found {segments}"
        )));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_part)
        .map_err(|e| JwtValidationError::MalformedToken(format!("header encoding: {e}")))?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| JwtValidationError::MalformedToken(format!("header json: {e}")))?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlg)
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` ahead of now.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let clock_skew_secs = i64::try_from(clock_skew.min(MAX_CLOCK_SKEW).as_secs()).unwrap_or(0);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Decode an Ed25519 public key from PEM-style text.
///
/// Header and footer lines are stripped and the remaining base64 is decoded.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content is not valid base64.
pub fn decode_ed25519_public_key_pem(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64)
}
