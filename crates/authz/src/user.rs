//! Identity model built from a verified claim set.
//!
//! [`Claims`] normalizes the loosely-typed token payload (string-or-array
//! roles, `scope` vs `scopes`, single or multiple audiences) into sets the
//! access list can evaluate, while keeping the raw claim map for generic
//! claim-key conditions and for re-signing fixtures.
//!
//! Subject, name and email are redacted in `Debug` output.

use crate::errors::TokenError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Claim keys that carry role membership, in lookup order.
const ROLE_CLAIM_KEYS: [&str; 4] = ["roles", "role", "groups", "group"];

/// Claim keys that carry OAuth scopes.
const SCOPE_CLAIM_KEYS: [&str; 2] = ["scope", "scopes"];

/// Per-path override carried under `acl.paths`. Currently has no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOverride {}

/// Token-embedded access list (`acl` claim).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessListClaim {
    /// Glob pattern -> override record.
    #[serde(default)]
    pub paths: BTreeMap<String, PathOverride>,
}

/// Normalized view of a token's claim set.
#[derive(Clone, PartialEq, Eq)]
pub struct Claims {
    /// `sub` - redacted in Debug output.
    pub subject: Option<String>,
    /// `name` - redacted in Debug output.
    pub name: Option<String>,
    /// `email` - redacted in Debug output.
    pub email: Option<String>,
    pub origin: Option<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub audience: Vec<String>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub not_before: Option<i64>,
    /// `addr` - source address the token was issued to.
    pub address: Option<String>,
    /// `acl` - token-level path allow-list.
    pub access_list: Option<AccessListClaim>,
    raw: Map<String, Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("subject", &self.subject.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("origin", &self.origin)
            .field("roles", &self.roles)
            .field("scopes", &self.scopes)
            .field("audience", &self.audience)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("not_before", &self.not_before)
            .field("address", &self.address)
            .field("access_list", &self.access_list)
            .finish_non_exhaustive()
    }
}

impl Claims {
    /// Normalize a raw claim map.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidClaims` when a well-known claim has the
    /// wrong JSON type (e.g. a non-numeric `exp` or a non-object `acl`).
    pub fn from_map(raw: Map<String, Value>) -> Result<Self, TokenError> {
        let mut roles = Vec::new();
        for key in ROLE_CLAIM_KEYS {
            if let Some(value) = raw.get(key) {
                extend_unique(&mut roles, string_list(key, value)?);
            }
        }
        for path in [
            ["realm_access", "roles"].as_slice(),
            ["app_metadata", "authorization", "roles"].as_slice(),
        ] {
            if let Some(value) = lookup_nested(&raw, path) {
                extend_unique(&mut roles, string_list(&path.join("."), value)?);
            }
        }

        let mut scopes = Vec::new();
        for key in SCOPE_CLAIM_KEYS {
            if let Some(value) = raw.get(key) {
                extend_unique(&mut scopes, string_list(key, value)?);
            }
        }

        let audience = match raw.get("aud") {
            Some(value) => string_list("aud", value)?,
            None => Vec::new(),
        };

        let access_list = match raw.get("acl") {
            Some(value) => Some(
                serde_json::from_value::<AccessListClaim>(value.clone())
                    .map_err(|e| TokenError::InvalidClaims(format!("acl: {e}")))?,
            ),
            None => None,
        };

        Ok(Self {
            subject: optional_string(&raw, "sub")?,
            name: optional_string(&raw, "name")?,
            email: optional_string(&raw, "email")?,
            origin: optional_string(&raw, "origin")?,
            roles,
            scopes,
            audience,
            issued_at: optional_timestamp(&raw, "iat")?,
            expires_at: optional_timestamp(&raw, "exp")?,
            not_before: optional_timestamp(&raw, "nbf")?,
            address: optional_string(&raw, "addr")?,
            access_list,
            raw,
        })
    }

    /// The claim map exactly as it appeared in the token.
    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// String values of an arbitrary top-level claim.
    ///
    /// Strings yield themselves, arrays yield their scalar members, numbers
    /// and booleans yield their JSON text. Objects and nulls yield nothing.
    #[must_use]
    pub fn values(&self, key: &str) -> Vec<String> {
        match self.raw.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(value) => scalar_text(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// A verified identity, owned by the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub claims: Claims,
    /// Name the token was found under (`access_token`, `bearer`, ...).
    pub token_name: String,
    /// The serialized token.
    pub token: String,
}

impl User {
    /// Build an unsigned user from a JSON claim document.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidClaims` if the document is not a JSON
    /// object or a well-known claim has the wrong type.
    pub fn from_json(claims: &str) -> Result<Self, TokenError> {
        let value: Value = serde_json::from_str(claims)
            .map_err(|e| TokenError::InvalidClaims(format!("claims json: {e}")))?;
        Self::from_value(value)
    }

    /// Build an unsigned user from a JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`User::from_json`].
    pub fn from_value(value: Value) -> Result<Self, TokenError> {
        match value {
            Value::Object(map) => Ok(Self {
                claims: Claims::from_map(map)?,
                token_name: String::new(),
                token: String::new(),
            }),
            other => Err(TokenError::InvalidClaims(format!(
                "claims must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A string is split on whitespace; an array must contain only strings.
fn string_list(key: &str, value: &Value) -> Result<Vec<String>, TokenError> {
    match value {
        Value::String(s) => Ok(s.split_whitespace().map(ToString::to_string).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(ToString::to_string).ok_or_else(|| {
                    TokenError::InvalidClaims(format!("{key}: expected array of strings"))
                })
            })
            .collect(),
        other => Err(TokenError::InvalidClaims(format!(
            "{key}: expected string or array, got {}",
            json_type(other)
        ))),
    }
}

fn extend_unique(target: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

fn lookup_nested<'a>(raw: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(raw.get(*first)?, |value, key| value.get(*key))
}

fn optional_string(raw: &Map<String, Value>, key: &str) -> Result<Option<String>, TokenError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(TokenError::InvalidClaims(format!(
            "{key}: expected string, got {}",
            json_type(other)
        ))),
    }
}

fn optional_timestamp(raw: &Map<String, Value>, key: &str) -> Result<Option<i64>, TokenError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            #[allow(clippy::cast_possible_truncation)]
            let ts = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64));
            ts.map(Some).ok_or_else(|| {
                TokenError::InvalidClaims(format!("{key}: timestamp out of range"))
            })
        }
        Some(other) => Err(TokenError::InvalidClaims(format!(
            "{key}: expected unix timestamp, got {}",
            json_type(other)
        ))),
    }
}
