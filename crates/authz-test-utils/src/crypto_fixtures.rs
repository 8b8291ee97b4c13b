//! Deterministic cryptographic fixtures for testing
//!
//! Provides the shared HMAC secret, reproducible Ed25519 keypairs and ready
//! key managers. All fixtures are deterministic based on seed values.

use authz::kms::{get_sign_keys, get_verify_keys, Key, KeyManager, TokenConfig};
use base64::engine::general_purpose;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Shared secret used for HS* fixtures.
pub fn shared_secret() -> &'static str {
    "8b53b66e-7071-4f7c-ab9a-3ec9dd891704"
}

/// Ed25519 keypair material for one seed.
#[derive(Debug, Clone)]
pub struct TestEd25519Key {
    /// Base64 of the raw 32-byte public key wrapped in PEM armor.
    pub public_key_pem: String,
    pub public_key: Vec<u8>,
    pub private_key_pkcs8: Vec<u8>,
}

/// Generate a deterministic Ed25519 signing key for testing.
///
/// The same seed always produces the same keypair, ensuring test reproducibility.
///
/// # Example
/// ```rust,ignore
/// let key = test_signing_key(1)?;
/// assert_eq!(key.public_key_pem, test_signing_key(1)?.public_key_pem);
/// ```
pub fn test_signing_key(seed: u8) -> Result<TestEd25519Key, FixtureError> {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    let public_key = key_pair.public_key().as_ref().to_vec();
    let public_key_pem = format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
        general_purpose::STANDARD.encode(&public_key)
    );

    Ok(TestEd25519Key {
        public_key_pem,
        public_key,
        private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
    })
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production keys come from real key material.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { version INTEGER 0, AlgorithmIdentifier { OID 1.3.101.112 },
    //            privateKey OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}

/// Key managers for a shared-secret method, as a one-element list.
pub fn test_key_managers(method: &str, secret: &str) -> Vec<KeyManager> {
    let manager = KeyManager::new(&TokenConfig::new(method, secret))
        .expect("shared secret key manager should build");
    vec![manager]
}

/// `HS512` key managers over [`shared_secret`].
pub fn test_hmac_key_managers() -> Vec<KeyManager> {
    test_key_managers("HS512", shared_secret())
}

/// `EdDSA` key manager that can both sign and verify.
pub fn test_ed25519_key_manager(seed: u8) -> KeyManager {
    let key = test_signing_key(seed).expect("ed25519 fixture");
    KeyManager::new(&TokenConfig::from_ed25519_der(
        Some(&key.private_key_pkcs8),
        Some(&key.public_key),
    ))
    .expect("ed25519 key manager should build")
}

/// First verify key across the HS512 fixture managers.
pub fn test_verify_keys() -> Vec<Key> {
    get_verify_keys(&test_hmac_key_managers())
}

/// First sign key across the HS512 fixture managers.
pub fn test_sign_key() -> Key {
    get_sign_keys(&test_hmac_key_managers())
        .into_iter()
        .next()
        .expect("HS512 fixture has a sign key")
}
