//! Token validator: the request authorization pipeline.
//!
//! ```text
//! extract -> verify -> identity -> source address -> path-claim gate -> access list
//! ```
//!
//! Configuration lives in an immutable [`ValidatorState`] snapshot behind an
//! `ArcSwap`. Every `configure` / `set_*` call validates its input, builds a
//! new snapshot and publishes it; in-flight requests finish against the
//! snapshot they loaded. Reads never take a lock.

pub mod sources;

pub use sources::{TokenSource, BEARER_TOKEN_NAME};

use crate::acl::path::path_glob;
use crate::acl::{AccessList, AclContext};
use crate::errors::AuthError;
use crate::kms::{self, Key};
use crate::observability::{hash_for_correlation, metrics};
use crate::options::TokenValidatorOptions;
use crate::request::RequestContext;
use crate::user::{AccessListClaim, Claims, User};
use arc_swap::ArcSwap;
use globset::GlobSetBuilder;
use sources::Candidate;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Token names accepted before `set_allowed_token_names` is called.
pub const DEFAULT_TOKEN_NAMES: [&str; 2] = ["access_token", "jwt_access_token"];

/// Extraction order before `set_source_priority` is called.
pub const DEFAULT_SOURCE_PRIORITY: [TokenSource; 3] =
    [TokenSource::Cookie, TokenSource::Header, TokenSource::Query];

/// One published configuration.
#[derive(Debug, Clone)]
struct ValidatorState {
    token_names: BTreeMap<TokenSource, Vec<String>>,
    sources: Vec<TokenSource>,
    keys: Arc<[Key]>,
    access_list: Option<Arc<AccessList>>,
    options: TokenValidatorOptions,
}

impl Default for ValidatorState {
    fn default() -> Self {
        let names: Vec<String> = DEFAULT_TOKEN_NAMES.iter().map(ToString::to_string).collect();
        Self {
            token_names: TokenSource::ALL
                .iter()
                .map(|source| (*source, names.clone()))
                .collect(),
            sources: DEFAULT_SOURCE_PRIORITY.to_vec(),
            keys: Arc::from(Vec::new()),
            access_list: None,
            options: TokenValidatorOptions::default(),
        }
    }
}

impl ValidatorState {
    fn names(&self, source: TokenSource) -> &[String] {
        self.token_names
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Authenticates and authorizes requests against a shared configuration.
///
/// Safe to share across threads (`Arc<TokenValidator>`); all methods take
/// `&self`.
pub struct TokenValidator {
    state: ArcSwap<ValidatorState>,
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        f.debug_struct("TokenValidator")
            .field("sources", &state.sources)
            .field("token_names", &state.token_names)
            .field("keys", &state.keys.len())
            .field("access_list", &state.access_list.as_ref().map(|acl| acl.len()))
            .field("options", &state.options)
            .finish()
    }
}

impl TokenValidator {
    /// A validator with default token names and source priority, and no
    /// keys. `authorize` fails with `NoKeys` until `configure` succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(ValidatorState::default()),
        }
    }

    /// Install verify keys, an optional access list and options.
    ///
    /// Only verify-usable keys are kept. A `None` access list selects
    /// authentication-only mode; an empty access list is accepted here and
    /// fails at authorization time.
    ///
    /// # Errors
    ///
    /// - `NoKeys` - `keys` is empty
    /// - `NoVerifyKeys` - no key is verify-usable
    #[instrument(skip_all, fields(keys = keys.len()))]
    pub fn configure(
        &self,
        keys: &[Key],
        access_list: Option<AccessList>,
        options: TokenValidatorOptions,
    ) -> Result<(), AuthError> {
        if keys.is_empty() {
            return Err(AuthError::NoKeys);
        }
        let usable: Arc<[Key]> = keys
            .iter()
            .filter(|k| k.is_verify_usable())
            .cloned()
            .collect::<Vec<_>>()
            .into();
        if usable.is_empty() {
            tracing::warn!(target: "authz.validator", "No usable verification keys");
            return Err(AuthError::NoVerifyKeys);
        }

        let access_list = access_list.map(Arc::new);
        tracing::info!(
            target: "authz.validator",
            usable_keys = usable.len(),
            rules = access_list.as_ref().map_or(0, |acl| acl.len()),
            authorization = access_list.is_some(),
            "Validator configured"
        );

        self.state.rcu(|current| ValidatorState {
            keys: Arc::clone(&usable),
            access_list: access_list.clone(),
            options,
            ..ValidatorState::clone(current)
        });
        Ok(())
    }

    /// Replace the allowed token names for every source.
    ///
    /// # Errors
    ///
    /// - `TokenNamesNotFound` - `names` is empty
    /// - `EmptyTokenName` - an entry is the empty string
    /// - `DuplicateTokenName` - an entry repeats
    pub fn set_allowed_token_names<S: AsRef<str>>(&self, names: &[S]) -> Result<(), AuthError> {
        if names.is_empty() {
            return Err(AuthError::TokenNamesNotFound);
        }
        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(names.len());
        for name in names.iter().map(AsRef::as_ref) {
            if name.is_empty() {
                return Err(AuthError::EmptyTokenName);
            }
            if !seen.insert(name) {
                return Err(AuthError::DuplicateTokenName(name.to_string()));
            }
            validated.push(name.to_string());
        }

        tracing::debug!(target: "authz.validator", names = ?validated, "Allowed token names set");
        let token_names: BTreeMap<_, _> = TokenSource::ALL
            .iter()
            .map(|source| (*source, validated.clone()))
            .collect();
        self.state.rcu(|current| ValidatorState {
            token_names: token_names.clone(),
            ..ValidatorState::clone(current)
        });
        Ok(())
    }

    /// Allowed token names for one source, in lookup order.
    #[must_use]
    pub fn allowed_token_names(&self, source: TokenSource) -> Vec<String> {
        self.state.load().names(source).to_vec()
    }

    /// Replace the extraction order.
    ///
    /// # Errors
    ///
    /// - `InvalidSourcePriority` - zero or more than three entries
    /// - `InvalidSourceName` - an entry is not header, cookie or query
    /// - `DuplicateSourceName` - an entry repeats
    pub fn set_source_priority<S: AsRef<str>>(&self, sources: &[S]) -> Result<(), AuthError> {
        if sources.is_empty() || sources.len() > TokenSource::ALL.len() {
            return Err(AuthError::InvalidSourcePriority);
        }
        let mut validated: Vec<TokenSource> = Vec::with_capacity(sources.len());
        for name in sources.iter().map(AsRef::as_ref) {
            let source: TokenSource = name.parse()?;
            if validated.contains(&source) {
                return Err(AuthError::DuplicateSourceName(name.to_string()));
            }
            validated.push(source);
        }

        tracing::debug!(target: "authz.validator", sources = ?validated, "Token source priority set");
        self.state.rcu(|current| ValidatorState {
            sources: validated.clone(),
            ..ValidatorState::clone(current)
        });
        Ok(())
    }

    #[must_use]
    pub fn source_priority(&self) -> Vec<TokenSource> {
        self.state.load().sources.clone()
    }

    #[must_use]
    pub fn options(&self) -> TokenValidatorOptions {
        self.state.load().options
    }

    #[must_use]
    pub fn access_list(&self) -> Option<Arc<AccessList>> {
        self.state.load().access_list.clone()
    }

    /// Authenticate the request and authorize it against the access lists.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`]; see the crate-level pipeline description.
    #[instrument(skip_all, name = "authz.authorize", fields(method = %req.method(), path = %req.path()))]
    pub fn authorize<R: RequestContext + ?Sized>(&self, req: &R) -> Result<User, AuthError> {
        let result = self.run(req, true);
        record(&result);
        result
    }

    /// Authenticate the request without consulting any access list.
    ///
    /// # Errors
    ///
    /// Configuration and authentication errors only.
    #[instrument(skip_all, name = "authz.authenticate")]
    pub fn authenticate<R: RequestContext + ?Sized>(&self, req: &R) -> Result<User, AuthError> {
        let result = self.run(req, false);
        record(&result);
        result
    }

    fn run<R: RequestContext + ?Sized>(&self, req: &R, authorize: bool) -> Result<User, AuthError> {
        let state = self.state.load_full();
        if state.keys.is_empty() {
            return Err(AuthError::NoKeys);
        }

        let Candidate { name, token } = state
            .sources
            .iter()
            .find_map(|source| {
                sources::extract(
                    req,
                    *source,
                    state.names(*source),
                    state.options.validate_bearer_header,
                )
            })
            .ok_or_else(|| {
                tracing::debug!(target: "authz.validator", stage = "extract", "No token found");
                AuthError::NoTokenFound
            })?;

        let raw = kms::verify_token(&state.keys, &token).map_err(|e| {
            tracing::debug!(target: "authz.validator", stage = "verify", token_name = %name, error = %e, "Token rejected");
            AuthError::InvalidToken(e)
        })?;
        let claims = Claims::from_map(raw)?;
        let subject_hash = claims.subject.as_deref().map(hash_for_correlation);
        tracing::debug!(
            target: "authz.validator",
            stage = "verify",
            token_name = %name,
            subject_hash = subject_hash.as_deref().unwrap_or("none"),
            "Token verified"
        );

        let user = User {
            claims,
            token_name: name,
            token,
        };

        if state.options.validate_source_address {
            check_source_address(&user.claims, req)?;
        }

        if authorize {
            authorize_user(&state, &user, req)?;
        }

        Ok(user)
    }
}

fn record(result: &Result<User, AuthError>) {
    match result {
        Ok(_) => metrics::record_authorization("success", None),
        Err(e) => metrics::record_authorization("error", Some(e.category().as_str())),
    }
}

fn check_source_address<R: RequestContext + ?Sized>(
    claims: &Claims,
    req: &R,
) -> Result<(), AuthError> {
    let token_addr = claims
        .address
        .as_deref()
        .ok_or(AuthError::SourceAddressNotFound)?;
    let request_addr = req.source_address().unwrap_or_default();
    if token_addr != request_addr {
        tracing::debug!(target: "authz.validator", stage = "source_address", "Source address mismatch");
        return Err(AuthError::SourceAddressMismatch {
            token: token_addr.to_string(),
            request: request_addr,
        });
    }
    Ok(())
}

fn authorize_user<R: RequestContext + ?Sized>(
    state: &ValidatorState,
    user: &User,
    req: &R,
) -> Result<(), AuthError> {
    let access_list = state.access_list.as_ref().ok_or(AuthError::NoAccessList)?;
    let (method, path) = (req.method(), req.path());

    if state.options.validate_access_list_path_claim {
        if let Some(claim) = &user.claims.access_list {
            check_path_claim(claim, path)?;
        }
    }

    let mut ctx = AclContext::new(&user.claims);
    if state.options.validate_method_path {
        ctx = ctx.with_request(method, path);
    }
    access_list.authorize(&ctx)
}

/// Token-level path allow-list. An `acl` claim without paths imposes no
/// restriction; patterns that fail to compile never match.
fn check_path_claim(claim: &AccessListClaim, path: &str) -> Result<(), AuthError> {
    if claim.paths.is_empty() {
        return Ok(());
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in claim.paths.keys() {
        match path_glob(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                tracing::debug!(target: "authz.validator", error = %e, "Skipping invalid acl path pattern");
            }
        }
    }
    let allowed = builder.build().is_ok_and(|set| set.is_match(path));

    if allowed {
        Ok(())
    } else {
        tracing::debug!(target: "authz.validator", stage = "path_acl", "Path not allowed by token acl");
        Err(AuthError::AccessNotAllowedByPathAcl)
    }
}
