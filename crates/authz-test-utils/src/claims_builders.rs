//! Builder patterns for test claim sets and personas
//!
//! Timestamps default to a token issued ten minutes ago, expiring in ten
//! minutes, with a `nbf` far in the past.

use authz::kms::Key;
use authz::User;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Map, Value};

/// Builder for creating test claim sets
///
/// # Example
/// ```rust,ignore
/// let user = TestClaimsBuilder::new()
///     .for_subject("smithj@outlook.com")
///     .with_roles(&["viewer"])
///     .signed_with(&test_sign_key());
/// ```
#[derive(Debug, Clone)]
pub struct TestClaimsBuilder {
    claims: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a new builder with valid timestamps and nothing else
    pub fn new() -> Self {
        let now = Utc::now();
        let nbf = Utc
            .with_ymd_and_hms(2015, 10, 10, 12, 0, 0)
            .single()
            .map(|t| t.timestamp())
            .unwrap_or(0);
        let mut claims = Map::new();
        claims.insert("exp".into(), json!((now + Duration::minutes(10)).timestamp()));
        claims.insert("iat".into(), json!((now - Duration::minutes(10)).timestamp()));
        claims.insert("nbf".into(), json!(nbf));
        Self { claims }
    }

    /// Set any claim
    pub fn with_claim(mut self, key: &str, value: Value) -> Self {
        self.claims.insert(key.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, key: &str) -> Self {
        self.claims.remove(key);
        self
    }

    pub fn for_subject(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    pub fn with_name(self, name: &str) -> Self {
        self.with_claim("name", json!(name))
    }

    pub fn with_email(self, email: &str) -> Self {
        self.with_claim("email", json!(email))
    }

    pub fn with_origin(self, origin: &str) -> Self {
        self.with_claim("origin", json!(origin))
    }

    pub fn with_roles(self, roles: &[&str]) -> Self {
        self.with_claim("roles", json!(roles))
    }

    pub fn with_scopes(self, scopes: &[&str]) -> Self {
        self.with_claim("scope", json!(scopes))
    }

    pub fn with_audience(self, audience: &[&str]) -> Self {
        match audience {
            [single] => self.with_claim("aud", json!(single)),
            many => self.with_claim("aud", json!(many)),
        }
    }

    pub fn with_address(self, addr: &str) -> Self {
        self.with_claim("addr", json!(addr))
    }

    /// Token-embedded path allow-list (`acl.paths`)
    pub fn with_acl_paths(self, paths: &[&str]) -> Self {
        let paths: Map<String, Value> = paths
            .iter()
            .map(|p| ((*p).to_string(), json!({})))
            .collect();
        self.with_claim("acl", json!({ "paths": paths }))
    }

    /// Set expiration in seconds from now (negative for expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set issued-at in seconds from now (positive for the future)
    pub fn issued_in(self, seconds: i64) -> Self {
        self.with_claim("iat", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim("nbf", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build an unsigned user
    pub fn build_user(self) -> User {
        User::from_value(self.build()).expect("fixture claims must be valid")
    }

    /// Build a user and sign it with `key` using the key's own algorithm
    pub fn signed_with(self, key: &Key) -> User {
        let mut user = self.build_user();
        let method = format!("{:?}", key.algorithm);
        key.sign_token(&method, &mut user)
            .expect("fixture key must be able to sign");
        user
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Viewer: read-only scope, two audiences.
pub fn viewer() -> TestClaimsBuilder {
    TestClaimsBuilder::new()
        .with_audience(&["https://127.0.0.1:2019/", "https://google.com/"])
        .for_subject("smithj@outlook.com")
        .with_scopes(&["read:books"])
}

/// Editor: write scope, localhost audience.
pub fn editor() -> TestClaimsBuilder {
    TestClaimsBuilder::new()
        .with_audience(&["https://localhost/"])
        .for_subject("jane.smith@outlook.com")
        .with_scopes(&["write:books"])
}

/// Viewer role bound to source address 10.10.10.10.
pub fn viewer_with_role() -> TestClaimsBuilder {
    TestClaimsBuilder::new()
        .with_name("Smith, John")
        .with_email("smithj@outlook.com")
        .with_origin("localhost")
        .for_subject("smithj@outlook.com")
        .with_roles(&["viewer"])
        .with_address("10.10.10.10")
}

/// Editor role.
pub fn editor_with_role() -> TestClaimsBuilder {
    TestClaimsBuilder::new()
        .with_name("Smith, Jane")
        .with_email("jane.smith@outlook.com")
        .with_origin("localhost")
        .for_subject("jane.smith@outlook.com")
        .with_roles(&["editor"])
}

/// Viewer role whose token only allows paths ending in `/allowed`.
pub fn viewer_with_path_acl() -> TestClaimsBuilder {
    TestClaimsBuilder::new()
        .with_name("Smith, John")
        .with_email("smithj@outlook.com")
        .with_origin("localhost")
        .for_subject("smithj@outlook.com")
        .with_roles(&["viewer"])
        .with_acl_paths(&["/**/allowed"])
}

/// Guest: `roles` is the whitespace separated string `anonymous guest`.
pub fn guest() -> TestClaimsBuilder {
    TestClaimsBuilder::new()
        .with_name("Smith, John")
        .with_email("smithj@outlook.com")
        .with_origin("localhost")
        .for_subject("smithj@outlook.com")
        .with_claim("roles", json!("anonymous guest"))
}
