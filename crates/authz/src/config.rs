//! Environment configuration.
//!
//! ```text
//! AUTHZ_TOKEN_SIGN_METHOD          HS512 (default), RS256, ES256, EdDSA, ...
//! AUTHZ_TOKEN_SECRET               shared secret for HS*
//! AUTHZ_TOKEN_PUBLIC_KEY_PEM       verification key for asymmetric methods
//! AUTHZ_TOKEN_PRIVATE_KEY_PEM      signing key for asymmetric methods
//! AUTHZ_TOKEN_NAME                 access_token (default)
//! AUTHZ_TOKEN_LIFETIME             seconds, 900 (default)
//! AUTHZ_ALLOWED_TOKEN_NAMES        comma separated
//! AUTHZ_TOKEN_SOURCES              comma separated: header,cookie,query
//! AUTHZ_ACL_RULES                  JSON array of rules; unset = authentication only
//! AUTHZ_VALIDATE_METHOD_PATH       bool
//! AUTHZ_VALIDATE_BEARER_HEADER     bool
//! AUTHZ_VALIDATE_PATH_CLAIM        bool
//! AUTHZ_VALIDATE_SOURCE_ADDRESS    bool
//! ```

use crate::acl::{AccessList, AuditSink, RuleConfig};
use crate::errors::AuthError;
use crate::kms::config::{DEFAULT_SIGN_METHOD, DEFAULT_TOKEN_LIFETIME_SECS, DEFAULT_TOKEN_NAME};
use crate::kms::{get_verify_keys, KeyManager, TokenConfig};
use crate::options::TokenValidatorOptions;
use crate::validator::TokenValidator;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Configuration rejected: {0}")]
    Rejected(#[from] AuthError),
}

#[derive(Debug)]
pub struct AuthzConfig {
    pub token: TokenConfig,
    pub allowed_token_names: Option<Vec<String>>,
    pub token_sources: Option<Vec<String>>,
    /// `None` builds an authentication-only validator.
    pub rules: Option<Vec<RuleConfig>>,
    pub options: TokenValidatorOptions,
}

impl AuthzConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let method = vars
            .get("AUTHZ_TOKEN_SIGN_METHOD")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SIGN_METHOD.to_string());

        let mut token = if method.starts_with("HS") {
            let secret = vars
                .get("AUTHZ_TOKEN_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("AUTHZ_TOKEN_SECRET".to_string()))?;
            TokenConfig::new(&method, secret)
        } else {
            let public = vars.get("AUTHZ_TOKEN_PUBLIC_KEY_PEM");
            let private = vars.get("AUTHZ_TOKEN_PRIVATE_KEY_PEM");
            if public.is_none() && private.is_none() {
                return Err(ConfigError::MissingEnvVar(
                    "AUTHZ_TOKEN_PUBLIC_KEY_PEM".to_string(),
                ));
            }
            let mut token = TokenConfig::from_pem(&method, None, public.map(String::as_str));
            token.private_key_pem = private.map(|pem| SecretString::from(pem.as_str()));
            token
        };

        token.token_name = vars
            .get("AUTHZ_TOKEN_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string());
        token.token_lifetime = match vars.get("AUTHZ_TOKEN_LIFETIME") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: "AUTHZ_TOKEN_LIFETIME".to_string(),
                reason: format!("{e}"),
            })?,
            None => DEFAULT_TOKEN_LIFETIME_SECS,
        };

        let rules = match vars.get("AUTHZ_ACL_RULES") {
            Some(raw) => Some(serde_json::from_str(raw).map_err(|e| {
                ConfigError::InvalidValue {
                    name: "AUTHZ_ACL_RULES".to_string(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let options = TokenValidatorOptions {
            validate_method_path: flag(vars, "AUTHZ_VALIDATE_METHOD_PATH")?,
            validate_bearer_header: flag(vars, "AUTHZ_VALIDATE_BEARER_HEADER")?,
            validate_access_list_path_claim: flag(vars, "AUTHZ_VALIDATE_PATH_CLAIM")?,
            validate_source_address: flag(vars, "AUTHZ_VALIDATE_SOURCE_ADDRESS")?,
        };

        Ok(AuthzConfig {
            token,
            allowed_token_names: list(vars, "AUTHZ_ALLOWED_TOKEN_NAMES"),
            token_sources: list(vars, "AUTHZ_TOKEN_SOURCES"),
            rules,
            options,
        })
    }

    /// Assemble a configured validator.
    ///
    /// `sink` receives audit entries from `log` rules.
    pub fn build_validator(
        &self,
        sink: Option<Arc<dyn AuditSink>>,
    ) -> Result<TokenValidator, ConfigError> {
        let manager = KeyManager::new(&self.token)?;

        let access_list = match &self.rules {
            Some(rules) => {
                let mut acl = AccessList::new();
                if let Some(sink) = sink {
                    acl.set_audit_sink(sink);
                }
                acl.add_rules(rules)?;
                Some(acl)
            }
            None => None,
        };

        let validator = TokenValidator::new();
        if let Some(names) = &self.allowed_token_names {
            validator.set_allowed_token_names(names.as_slice())?;
        }
        if let Some(sources) = &self.token_sources {
            validator.set_source_priority(sources.as_slice())?;
        }
        validator.configure(&get_verify_keys(&[manager]), access_list, self.options)?;

        tracing::info!(
            target: "authz.config",
            method = %self.token.token_sign_method,
            authorization = self.rules.is_some(),
            "Validator built from configuration"
        );
        Ok(validator)
    }
}

fn list(vars: &HashMap<String, String>, name: &str) -> Option<Vec<String>> {
    vars.get(name)
        .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
}

fn flag(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
