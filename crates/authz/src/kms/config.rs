//! Token/key configuration consumed by [`super::KeyManager::new`].

use crate::errors::AuthError;
use common::secret::{secret_bytes, SecretSlice, SecretString};
use serde::Deserialize;

pub const DEFAULT_TOKEN_NAME: &str = "access_token";
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 900;
pub const DEFAULT_SIGN_METHOD: &str = "HS512";

fn default_token_name() -> String {
    DEFAULT_TOKEN_NAME.to_string()
}

fn default_token_lifetime() -> u64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

fn default_sign_method() -> String {
    DEFAULT_SIGN_METHOD.to_string()
}

/// Raw Ed25519 key bytes: PKCS#8 private key and 32-byte public key.
#[derive(Debug)]
pub struct Ed25519Der {
    pub private_key_pkcs8: Option<SecretSlice<u8>>,
    pub public_key: Option<Vec<u8>>,
}

/// One normalized key configuration: algorithm, token metadata and key
/// material. Exactly which material is required depends on the algorithm
/// family (shared secret for `HS*`, PEM for `RS*`/`PS*`/`ES*`, PEM or DER
/// for `EdDSA`).
#[derive(Debug, Deserialize)]
pub struct TokenConfig {
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default = "default_token_name")]
    pub token_name: String,
    /// Seconds.
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime: u64,
    #[serde(default = "default_sign_method")]
    pub token_sign_method: String,
    #[serde(default)]
    pub token_secret: Option<SecretString>,
    #[serde(default)]
    pub private_key_pem: Option<SecretString>,
    #[serde(default)]
    pub public_key_pem: Option<String>,
    #[serde(skip)]
    pub ed25519_der: Option<Ed25519Der>,
}

impl TokenConfig {
    fn with_method(method: &str) -> Self {
        Self {
            key_id: None,
            token_name: default_token_name(),
            token_lifetime: default_token_lifetime(),
            token_sign_method: method.to_string(),
            token_secret: None,
            private_key_pem: None,
            public_key_pem: None,
            ed25519_der: None,
        }
    }

    /// Shared-secret configuration for the `HS*` family.
    #[must_use]
    pub fn new(method: &str, secret: &str) -> Self {
        Self {
            token_secret: Some(SecretString::from(secret)),
            ..Self::with_method(method)
        }
    }

    /// PEM configuration for `RS*`, `PS*`, `ES*` and `EdDSA`.
    ///
    /// Omitting the private key yields a verify-only key; omitting the
    /// public key yields a sign-only key.
    #[must_use]
    pub fn from_pem(method: &str, private_key_pem: Option<&str>, public_key_pem: Option<&str>) -> Self {
        Self {
            private_key_pem: private_key_pem.map(SecretString::from),
            public_key_pem: public_key_pem.map(ToString::to_string),
            ..Self::with_method(method)
        }
    }

    /// Raw Ed25519 configuration (`EdDSA`).
    #[must_use]
    pub fn from_ed25519_der(private_key_pkcs8: Option<&[u8]>, public_key: Option<&[u8]>) -> Self {
        Self {
            ed25519_der: Some(Ed25519Der {
                private_key_pkcs8: private_key_pkcs8.map(secret_bytes),
                public_key: public_key.map(<[u8]>::to_vec),
            }),
            ..Self::with_method("EdDSA")
        }
    }

    /// Parse a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidTokenConfig` if the document does not parse.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(|e| AuthError::InvalidTokenConfig(e.to_string()))
    }

    #[must_use]
    pub fn with_token_name(mut self, name: &str) -> Self {
        self.token_name = name.to_string();
        self
    }

    #[must_use]
    pub fn with_lifetime(mut self, seconds: u64) -> Self {
        self.token_lifetime = seconds;
        self
    }

    #[must_use]
    pub fn with_key_id(mut self, key_id: &str) -> Self {
        self.key_id = Some(key_id.to_string());
        self
    }
}
