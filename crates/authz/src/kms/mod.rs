//! Key management: keys, capabilities and token verification.
//!
//! A [`KeyManager`] holds keys built from one [`TokenConfig`]. The validator
//! is configured with the verify-usable subset of one or more managers
//! (see [`get_verify_keys`]); fixtures sign with [`get_sign_keys`].

pub mod config;
pub mod key;

pub use config::{Ed25519Der, TokenConfig};
pub use key::{algorithm_name, family_methods, Key, KeyCapability};

use crate::errors::{AuthError, TokenError};
use common::jwt::{self, JwtValidationError, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::instrument;

/// An ordered collection of keys.
#[derive(Debug, Clone, Default)]
pub struct KeyManager {
    keys: Vec<Key>,
}

impl KeyManager {
    /// Build a key manager from one token configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidTokenConfig` - empty token name, zero lifetime, or missing /
    ///   unparseable key material
    /// - `UnsupportedSignMethod` - unknown algorithm
    #[instrument(skip_all, fields(method = %config.token_sign_method))]
    pub fn new(config: &TokenConfig) -> Result<Self, AuthError> {
        if config.token_name.is_empty() {
            return Err(AuthError::InvalidTokenConfig(
                "token name is empty".to_string(),
            ));
        }
        if config.token_lifetime == 0 {
            return Err(AuthError::InvalidTokenConfig(
                "token lifetime must be positive".to_string(),
            ));
        }

        let key = Key::from_config(config)?;
        tracing::debug!(
            target: "authz.kms",
            key_id = %key.id,
            sign = key.sign.capable,
            verify = key.verify.capable,
            "Key loaded"
        );
        Ok(Self { keys: vec![key] })
    }

    /// Build from already-constructed keys.
    #[must_use]
    pub fn from_keys(keys: Vec<Key>) -> Self {
        Self { keys }
    }

    pub fn add_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Keys with verify capability, in insertion order.
    pub fn verify_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|k| k.verify.capable)
    }

    /// Keys with sign capability, in insertion order.
    pub fn sign_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|k| k.sign.capable)
    }
}

/// Verify-capable keys across managers, in manager then insertion order.
#[must_use]
pub fn get_verify_keys(managers: &[KeyManager]) -> Vec<Key> {
    managers
        .iter()
        .flat_map(KeyManager::verify_keys)
        .cloned()
        .collect()
}

/// Sign-capable keys across managers, in manager then insertion order.
#[must_use]
pub fn get_sign_keys(managers: &[KeyManager]) -> Vec<Key> {
    managers
        .iter()
        .flat_map(KeyManager::sign_keys)
        .cloned()
        .collect()
}

impl From<JwtValidationError> for TokenError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => TokenError::TooLarge,
            JwtValidationError::MalformedToken(reason) => TokenError::ParseFailed(reason),
            JwtValidationError::MissingAlg => {
                TokenError::ParseFailed("header has no algorithm".to_string())
            }
            JwtValidationError::IatTooFarInFuture => TokenError::IssuedInFuture,
        }
    }
}

/// Verify a token against keys in order and return its raw claim map.
///
/// Keys whose method set does not contain the header algorithm are skipped.
/// The first successful verification wins; otherwise the last failure is
/// returned.
///
/// # Errors
///
/// - `TooLarge` / `ParseFailed` - rejected before any key is tried
/// - `NoCompatibleKey` - no usable key accepts the header algorithm
/// - `SignatureInvalid`, `Expired`, `NotYetValid`, `InvalidClaims` - from
///   the last key tried
/// - `IssuedInFuture` - `iat` beyond the allowed clock skew
pub fn verify_token(keys: &[Key], token: &str) -> Result<Map<String, Value>, TokenError> {
    let alg_name = jwt::extract_alg(token)?;
    let Ok(alg) = Algorithm::from_str(&alg_name) else {
        return Err(TokenError::NoCompatibleKey(alg_name));
    };

    let mut last_error = None;
    for key in keys.iter().filter(|k| k.accepts(alg)) {
        match key.verify(alg, token) {
            Ok(claims) => {
                if let Some(iat) = claims.get("iat").and_then(timestamp) {
                    jwt::validate_iat(iat, DEFAULT_CLOCK_SKEW)?;
                }
                return Ok(claims);
            }
            Err(e) => {
                tracing::debug!(target: "authz.kms", key_id = %key.id, error = %e, "Key rejected token");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(TokenError::NoCompatibleKey(alg_name)))
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}
