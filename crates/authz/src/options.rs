//! Validator feature toggles.

use serde::{Deserialize, Serialize};

/// Independent switches for the optional pipeline checks.
///
/// All default to off. Stored verbatim by `configure`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenValidatorOptions {
    /// Expose the request method and path to ACL conditions.
    pub validate_method_path: bool,
    /// Accept `Authorization: Bearer <token>` under the name `bearer`.
    pub validate_bearer_header: bool,
    /// Enforce the token-embedded `acl.paths` allow-list.
    pub validate_access_list_path_claim: bool,
    /// Require the token's `addr` claim to equal the request address.
    pub validate_source_address: bool,
}
