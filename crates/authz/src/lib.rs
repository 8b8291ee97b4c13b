//! Request authentication and authorization library.
//!
//! Validates signed tokens carried on HTTP requests and evaluates the
//! resulting identity against an ordered allow/deny rule list.
//!
//! # Modules
//!
//! - `acl` - Access list engine (rules, conditions, audit sinks)
//! - `config` - Environment configuration
//! - `errors` - Error types
//! - `kms` - Keys, key managers and token verification
//! - `observability` - Metrics and log correlation helpers
//! - `options` - Validator feature toggles
//! - `request` - Request abstraction
//! - `user` - Identity model
//! - `validator` - Token validator (the authorization entry point)
//!
//! # Example
//!
//! ```rust,ignore
//! use authz::{AccessList, KeyManager, RuleConfig, TokenConfig, TokenValidator};
//! use authz::kms::get_verify_keys;
//!
//! let keys = KeyManager::new(&TokenConfig::new("HS512", secret))?;
//! let mut acl = AccessList::new();
//! acl.add_rules(&[RuleConfig::new(["match roles viewer"], "allow")])?;
//!
//! let validator = TokenValidator::new();
//! validator.configure(&get_verify_keys(&[keys]), Some(acl), Default::default())?;
//! let user = validator.authorize(&request)?;
//! ```

pub mod acl;
pub mod config;
pub mod errors;
pub mod kms;
pub mod observability;
pub mod options;
pub mod request;
pub mod user;
pub mod validator;

pub use acl::{AccessList, AclContext, AuditEntry, AuditSink, RuleConfig, Verdict};
pub use errors::{AuthError, TokenError};
pub use kms::{Key, KeyManager, TokenConfig};
pub use options::TokenValidatorOptions;
pub use request::RequestContext;
pub use user::{Claims, User};
pub use validator::{TokenSource, TokenValidator};
