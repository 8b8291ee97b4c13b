//! # Authz Test Utilities
//!
//! Shared test utilities for the `authz` crate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (shared HMAC secret, seeded Ed25519 keys)
//! - Claim builders and personas (TestClaimsBuilder, viewer(), editor(), ...)
//! - Request builders over `axum::http::Request`
//! - Access list fixtures and a recording audit sink
//! - Custom assertions (TokenAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authz_test_utils::*;
//!
//! #[test]
//! fn test_example() {
//!     let user = viewer_with_role().signed_with(&test_sign_key());
//!     user.token.assert_valid_jwt().assert_alg("HS512");
//!
//!     let request = TestRequestBuilder::get("/app/viewer")
//!         .bearer(&user.token)
//!         .build();
//! }
//! ```

pub mod acl_fixtures;
pub mod assertions;
pub mod claims_builders;
pub mod crypto_fixtures;
pub mod request;

// Re-export commonly used items
pub use acl_fixtures::*;
pub use assertions::*;
pub use claims_builders::*;
pub use crypto_fixtures::*;
pub use request::*;
