//! Common utilities shared across the authz crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT pre-parse utilities (size limit, header peek, iat skew)
pub mod jwt;
