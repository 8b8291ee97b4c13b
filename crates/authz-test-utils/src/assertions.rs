//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions on serialized tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing segment {index}"));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {index}: {e:?}"))
}

fn header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0))
        .unwrap_or_else(|e| panic!("Failed to parse JWT header JSON: {e:?}"))
}

fn payload(token: &str) -> Value {
    serde_json::from_slice(&segment(token, 1))
        .unwrap_or_else(|e| panic!("Failed to parse JWT payload JSON: {e:?}"))
}

/// Custom assertions for signed tokens
///
/// # Example
/// ```rust,ignore
/// user.token
///     .assert_valid_jwt()
///     .assert_alg("HS512")
///     .assert_claim("sub", json!("smithj@outlook.com"));
/// ```
pub trait TokenAssertions {
    /// Assert that the token is three base64url segments with a JWT header
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the header `alg`
    fn assert_alg(&self, alg: &str) -> &Self;

    /// Assert a payload claim equals `expected`
    fn assert_claim(&self, name: &str, expected: Value) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts: Vec<_> = self.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts.len()
        );
        assert_eq!(header(self).typ, "JWT", "Expected JWT type");
        assert!(payload(self).is_object(), "JWT payload must be an object");
        self
    }

    fn assert_alg(&self, alg: &str) -> &Self {
        assert_eq!(header(self).alg, alg, "Unexpected signing algorithm");
        self
    }

    fn assert_claim(&self, name: &str, expected: Value) -> &Self {
        let claims = payload(self);
        assert_eq!(
            claims.get(name),
            Some(&expected),
            "Claim '{name}' mismatch in {claims}"
        );
        self
    }
}
