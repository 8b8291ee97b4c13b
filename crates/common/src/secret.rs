//! Secret types for key material that must never reach a log line.
//!
//! Re-exports the [`secrecy`] types used for HMAC shared secrets, private key
//! PEM blocks and raw PKCS#8 bytes. `Debug` on these types prints a redaction
//! marker, so any struct deriving `Debug` that holds one is safe to trace.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SharedSecretConfig {
//!     sign_method: String,
//!     secret: SecretString,
//! }
//!
//! let cfg = SharedSecretConfig {
//!     sign_method: "HS512".to_string(),
//!     secret: SecretString::from("8b53b66e-7071-4f7c-ab9a-3ec9dd891704"),
//! };
//!
//! assert!(!format!("{cfg:?}").contains("8b53b66e"));
//! let raw: &str = cfg.secret.expose_secret();
//! assert_eq!(raw.len(), 36);
//! ```
//!
//! Use `SecretString` for shared secrets and PEM text, `SecretSlice<u8>` for
//! DER / PKCS#8 private key bytes.

pub use secrecy::{ExposeSecret, SecretBox, SecretSlice, SecretString};

/// Copy raw bytes into a [`SecretSlice`].
#[must_use]
pub fn secret_bytes(bytes: &[u8]) -> SecretSlice<u8> {
    SecretSlice::from(bytes.to_vec())
}
