//! Error taxonomy for the authorization pipeline.
//!
//! Every failure is a typed variant carrying its arguments as fields, so
//! callers branch on the variant and render arguments without parsing text.
//! Variants fall into three categories (see [`ErrorCategory`]):
//!
//! - Configuration: rejected by `configure`, `set_*`, `add_rules` or
//!   `KeyManager::new`. Fatal, never retried.
//! - Authentication: the request carried no usable token or the token does
//!   not belong to the caller. Terminal for the request.
//! - Authorization: the identity is valid but policy denies it.

use crate::observability::ErrorCategory;
use thiserror::Error;

/// Why a candidate token failed verification.
///
/// Wrapped by [`AuthError::InvalidToken`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The token could not be parsed as a compact JWS.
    #[error("failed to parse token: {0}")]
    ParseFailed(String),

    /// The token exceeds the maximum accepted size.
    #[error("token too large")]
    TooLarge,

    /// No configured verify key supports the token's algorithm.
    #[error("no verification key supports algorithm {0}")]
    NoCompatibleKey(String),

    /// Signature verification failed against every compatible key.
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// The `exp` claim is in the past.
    #[error("token has expired")]
    Expired,

    /// The `nbf` claim is in the future.
    #[error("token is not yet valid")]
    NotYetValid,

    /// The `iat` claim is further in the future than clock skew allows.
    #[error("token issued-at time is in the future")]
    IssuedInFuture,

    /// The verified payload is not a usable claim set.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
}

/// Errors produced by the key manager, access list and token validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------
    /// `configure` was given an empty key slice, or `authorize` ran before
    /// any keys were configured.
    #[error("keystore has no keys")]
    NoKeys,

    /// Keys were supplied but none is verify-capable with a token name and
    /// a positive max lifetime.
    #[error("keystore has no usable verification keys")]
    NoVerifyKeys,

    /// `set_allowed_token_names` was given an empty list.
    #[error("allowed token names not provided")]
    TokenNamesNotFound,

    /// An allowed token name was the empty string.
    #[error("found empty allowed token name")]
    EmptyTokenName,

    /// An allowed token name appeared twice.
    #[error("found duplicate allowed token name: {0}")]
    DuplicateTokenName(String),

    /// Source priority list was empty or longer than three entries.
    #[error("token source priority must list between 1 and 3 sources")]
    InvalidSourcePriority,

    /// Source priority contained something other than header, cookie, query.
    #[error("invalid token source name: {0}")]
    InvalidSourceName(String),

    /// Source priority listed the same source twice.
    #[error("duplicate token source name: {0}")]
    DuplicateSourceName(String),

    /// The access list has no rules.
    #[error("access list has no rules")]
    AccessListNoRules,

    /// A rule was added with no conditions.
    #[error("rule {index} has no conditions")]
    RuleNoConditions { index: usize },

    /// A rule action was not `allow` or `deny`, optionally followed by `log`.
    #[error("rule {index} has invalid action: {action}")]
    InvalidRuleAction { index: usize, action: String },

    /// A rule condition could not be parsed or compiled.
    #[error("rule {index} has invalid condition {condition:?}: {reason}")]
    InvalidRuleCondition {
        index: usize,
        condition: String,
        reason: String,
    },

    /// The signing method is not one this key manager supports.
    #[error("unsupported token sign method: {0}")]
    UnsupportedSignMethod(String),

    /// The token config is missing or carries unusable key material.
    #[error("invalid token config: {0}")]
    InvalidTokenConfig(String),

    /// A key without signing capability was asked to sign.
    #[error("key {key_id} is not capable of signing with {method}")]
    SigningNotSupported { key_id: String, method: String },

    /// The signing library rejected the claims or key.
    #[error("failed to sign token: {0}")]
    SigningFailed(String),

    // ---------------------------------------------------------------------
    // Authentication
    // ---------------------------------------------------------------------
    /// No allowed token name was present in any configured source.
    #[error("no token found")]
    NoTokenFound,

    /// The candidate token failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),

    /// Source address validation is on but the token has no `addr` claim.
    #[error("source address not found in token")]
    SourceAddressNotFound,

    /// The token's `addr` claim differs from the request's address.
    #[error("source address mismatch: token {token}, request {request}")]
    SourceAddressMismatch { token: String, request: String },

    // ---------------------------------------------------------------------
    // Authorization
    // ---------------------------------------------------------------------
    /// A deny rule matched, or no rule matched at all.
    #[error("access not allowed")]
    AccessNotAllowed,

    /// The request path is outside the token's embedded `acl.paths`.
    #[error("access not allowed by path acl")]
    AccessNotAllowedByPathAcl,

    /// Authorization was requested but no access list was configured.
    #[error("access list not configured")]
    NoAccessList,
}

impl AuthError {
    /// Category used for metrics labels and status mapping.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::NoKeys
            | AuthError::NoVerifyKeys
            | AuthError::TokenNamesNotFound
            | AuthError::EmptyTokenName
            | AuthError::DuplicateTokenName(_)
            | AuthError::InvalidSourcePriority
            | AuthError::InvalidSourceName(_)
            | AuthError::DuplicateSourceName(_)
            | AuthError::AccessListNoRules
            | AuthError::RuleNoConditions { .. }
            | AuthError::InvalidRuleAction { .. }
            | AuthError::InvalidRuleCondition { .. }
            | AuthError::UnsupportedSignMethod(_)
            | AuthError::InvalidTokenConfig(_)
            | AuthError::SigningNotSupported { .. }
            | AuthError::SigningFailed(_) => ErrorCategory::Configuration,
            AuthError::NoTokenFound
            | AuthError::InvalidToken(_)
            | AuthError::SourceAddressNotFound
            | AuthError::SourceAddressMismatch { .. } => ErrorCategory::Authentication,
            AuthError::AccessNotAllowed
            | AuthError::AccessNotAllowedByPathAcl
            | AuthError::NoAccessList => ErrorCategory::Authorization,
        }
    }

    /// HTTP status a host integration should answer with.
    ///
    /// A missing access list is a deployment fault, not a policy verdict, so
    /// it maps to 500 alongside the configuration errors.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::NoAccessList => 500,
            _ => match self.category() {
                ErrorCategory::Configuration => 500,
                ErrorCategory::Authentication => 401,
                ErrorCategory::Authorization => 403,
            },
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        AuthError::InvalidToken(err)
    }
}
