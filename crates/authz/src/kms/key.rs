//! Keys and their sign/verify capabilities.

use super::config::TokenConfig;
use crate::errors::{AuthError, TokenError};
use crate::user::User;
use common::jwt::decode_ed25519_public_key_pem;
use common::secret::ExposeSecret;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

const HMAC_FAMILY: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
const RSA_FAMILY: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Canonical JOSE name of an algorithm (`HS512`, `EdDSA`, ...).
#[must_use]
pub fn algorithm_name(alg: Algorithm) -> String {
    format!("{alg:?}")
}

/// Parse a JOSE algorithm name.
///
/// # Errors
///
/// Returns `AuthError::UnsupportedSignMethod` for unknown names.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    Algorithm::from_str(name).map_err(|_| AuthError::UnsupportedSignMethod(name.to_string()))
}

/// Algorithms a key of the given algorithm can verify or sign.
///
/// HMAC and RSA keys work for their whole family; EC and Ed25519 keys are
/// bound to a single curve.
#[must_use]
pub fn family_methods(alg: Algorithm) -> Vec<Algorithm> {
    if HMAC_FAMILY.contains(&alg) {
        HMAC_FAMILY.to_vec()
    } else if RSA_FAMILY.contains(&alg) {
        RSA_FAMILY.to_vec()
    } else {
        vec![alg]
    }
}

/// Sign or verify capability record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCapability {
    pub capable: bool,
    /// Token name this capability applies to (e.g. `access_token`).
    pub token_name: String,
    /// Lifetime ceiling in seconds for issued tokens.
    pub max_lifetime: u64,
    pub methods: Vec<Algorithm>,
}

impl KeyCapability {
    fn enabled(token_name: &str, max_lifetime: u64, methods: Vec<Algorithm>) -> Self {
        Self {
            capable: true,
            token_name: token_name.to_string(),
            max_lifetime,
            methods,
        }
    }
}

/// A single key with independent sign and verify capabilities.
#[derive(Clone)]
pub struct Key {
    pub id: String,
    pub algorithm: Algorithm,
    pub sign: KeyCapability,
    pub verify: KeyCapability,
    encoding: Option<EncodingKey>,
    decoding: Option<DecodingKey>,
}

impl Default for Key {
    fn default() -> Self {
        Self {
            id: "0".to_string(),
            algorithm: Algorithm::HS512,
            sign: KeyCapability::default(),
            verify: KeyCapability::default(),
            encoding: None,
            decoding: None,
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("sign", &self.sign)
            .field("verify", &self.verify)
            .field("encoding", &self.encoding.as_ref().map(|_| "[REDACTED]"))
            .field("decoding", &self.decoding.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Key {
    /// Build a key from a token configuration.
    ///
    /// # Errors
    ///
    /// - `UnsupportedSignMethod` - unknown algorithm name
    /// - `InvalidTokenConfig` - missing or unparseable key material
    pub(crate) fn from_config(config: &TokenConfig) -> Result<Self, AuthError> {
        let alg = parse_algorithm(&config.token_sign_method)?;
        let (encoding, decoding) = load_material(alg, config)?;
        let methods = family_methods(alg);

        let sign = match encoding {
            Some(_) => KeyCapability::enabled(&config.token_name, config.token_lifetime, methods.clone()),
            None => KeyCapability::default(),
        };
        let verify = match decoding {
            Some(_) => KeyCapability::enabled(&config.token_name, config.token_lifetime, methods),
            None => KeyCapability::default(),
        };

        Ok(Self {
            id: config.key_id.clone().unwrap_or_else(|| "0".to_string()),
            algorithm: alg,
            sign,
            verify,
            encoding,
            decoding,
        })
    }

    /// Verify-capable with a token name and a positive lifetime ceiling.
    #[must_use]
    pub fn is_verify_usable(&self) -> bool {
        self.verify.capable && !self.verify.token_name.is_empty() && self.verify.max_lifetime > 0
    }

    #[must_use]
    pub fn is_sign_usable(&self) -> bool {
        self.sign.capable && self.encoding.is_some()
    }

    /// Whether this key can attempt verification of a token signed with `alg`.
    pub(crate) fn accepts(&self, alg: Algorithm) -> bool {
        self.is_verify_usable() && self.decoding.is_some() && self.verify.methods.contains(&alg)
    }

    /// Verify signature plus `exp` and `nbf`, returning the raw claim map.
    pub(crate) fn verify(&self, alg: Algorithm, token: &str) -> Result<Map<String, Value>, TokenError> {
        let decoding = self
            .decoding
            .as_ref()
            .ok_or_else(|| TokenError::NoCompatibleKey(algorithm_name(alg)))?;

        let mut validation = Validation::new(alg);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        decode::<Map<String, Value>>(token, decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| token_error(&e))
    }

    /// Sign the user's claim set and store the token on the user.
    ///
    /// # Errors
    ///
    /// - `UnsupportedSignMethod` - unknown algorithm name
    /// - `SigningNotSupported` - key lacks signing capability for `method`
    /// - `SigningFailed` - the claims could not be encoded
    #[instrument(skip_all, fields(key_id = %self.id))]
    pub fn sign_token(&self, method: &str, user: &mut User) -> Result<(), AuthError> {
        let alg = parse_algorithm(method)?;
        let encoding = match &self.encoding {
            Some(encoding) if self.sign.capable && self.sign.methods.contains(&alg) => encoding,
            _ => {
                return Err(AuthError::SigningNotSupported {
                    key_id: self.id.clone(),
                    method: method.to_string(),
                })
            }
        };

        let mut header = Header::new(alg);
        header.typ = Some("JWT".to_string());

        let token = encode(&header, user.claims.raw(), encoding).map_err(|e| {
            tracing::debug!(target: "authz.kms", error = %e, "Token signing failed");
            AuthError::SigningFailed(e.to_string())
        })?;

        user.token = token;
        if user.token_name.is_empty() {
            user.token_name.clone_from(&self.sign.token_name);
        }
        Ok(())
    }
}

fn token_error(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::InvalidClaims(format!("missing required claim: {claim}"))
        }
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::InvalidAlgorithmName => TokenError::ParseFailed(err.to_string()),
        _ => TokenError::SignatureInvalid,
    }
}

fn invalid(reason: impl Into<String>) -> AuthError {
    AuthError::InvalidTokenConfig(reason.into())
}

type Material = (Option<EncodingKey>, Option<DecodingKey>);

fn load_material(alg: Algorithm, config: &TokenConfig) -> Result<Material, AuthError> {
    let name = algorithm_name(alg);
    let private_pem = config
        .private_key_pem
        .as_ref()
        .map(|pem| pem.expose_secret().as_bytes().to_vec());
    let public_pem = config.public_key_pem.as_deref();

    let material = if HMAC_FAMILY.contains(&alg) {
        let secret = config
            .token_secret
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid(format!("{name} requires a shared secret")))?;
        (
            Some(EncodingKey::from_secret(secret.as_bytes())),
            Some(DecodingKey::from_secret(secret.as_bytes())),
        )
    } else if RSA_FAMILY.contains(&alg) {
        (
            private_pem
                .map(|pem| EncodingKey::from_rsa_pem(&pem))
                .transpose()
                .map_err(|e| invalid(format!("rsa private key: {e}")))?,
            public_pem
                .map(|pem| DecodingKey::from_rsa_pem(pem.as_bytes()))
                .transpose()
                .map_err(|e| invalid(format!("rsa public key: {e}")))?,
        )
    } else if matches!(alg, Algorithm::ES256 | Algorithm::ES384) {
        (
            private_pem
                .map(|pem| EncodingKey::from_ec_pem(&pem))
                .transpose()
                .map_err(|e| invalid(format!("ec private key: {e}")))?,
            public_pem
                .map(|pem| DecodingKey::from_ec_pem(pem.as_bytes()))
                .transpose()
                .map_err(|e| invalid(format!("ec public key: {e}")))?,
        )
    } else if alg == Algorithm::EdDSA {
        load_ed25519(config, private_pem.as_deref(), public_pem)?
    } else {
        return Err(AuthError::UnsupportedSignMethod(name));
    };

    if material.0.is_none() && material.1.is_none() {
        return Err(invalid(format!("{name} requires key material")));
    }
    Ok(material)
}

fn load_ed25519(
    config: &TokenConfig,
    private_pem: Option<&[u8]>,
    public_pem: Option<&str>,
) -> Result<Material, AuthError> {
    if let Some(der) = &config.ed25519_der {
        return Ok((
            der.private_key_pkcs8
                .as_ref()
                .map(|pkcs8| EncodingKey::from_ed_der(pkcs8.expose_secret())),
            der.public_key.as_deref().map(DecodingKey::from_ed_der),
        ));
    }

    let encoding = private_pem
        .map(EncodingKey::from_ed_pem)
        .transpose()
        .map_err(|e| invalid(format!("ed25519 private key: {e}")))?;

    // SPKI PEM first, then base64 of the raw 32-byte public key.
    let decoding = match public_pem {
        Some(pem) => match DecodingKey::from_ed_pem(pem.as_bytes()) {
            Ok(key) => Some(key),
            Err(_) => {
                let raw = decode_ed25519_public_key_pem(pem)
                    .map_err(|e| invalid(format!("ed25519 public key: {e}")))?;
                if raw.len() != 32 {
                    return Err(invalid("ed25519 public key must be 32 bytes"));
                }
                Some(DecodingKey::from_ed_der(&raw))
            }
        },
        None => None,
    };

    Ok((encoding, decoding))
}
