//! Token sources and extraction.

use crate::errors::AuthError;
use crate::request::RequestContext;
use std::fmt;
use std::str::FromStr;

/// Where a token may be carried on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenSource {
    Header,
    Cookie,
    Query,
}

impl TokenSource {
    pub const ALL: [TokenSource; 3] = [TokenSource::Header, TokenSource::Cookie, TokenSource::Query];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::Header => "header",
            TokenSource::Cookie => "cookie",
            TokenSource::Query => "query",
        }
    }
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenSource {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(TokenSource::Header),
            "cookie" => Ok(TokenSource::Cookie),
            "query" => Ok(TokenSource::Query),
            other => Err(AuthError::InvalidSourceName(other.to_string())),
        }
    }
}

/// Name the token was found under when it arrived as `Authorization: Bearer`.
pub const BEARER_TOKEN_NAME: &str = "bearer";

/// A token string and the name it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub name: String,
    pub token: String,
}

impl Candidate {
    fn new(name: &str, token: &str) -> Option<Self> {
        let token = token.trim();
        (!token.is_empty()).then(|| Self {
            name: name.to_string(),
            token: token.to_string(),
        })
    }
}

/// Look for any allowed name in one source.
///
/// Header lookup order:
/// 1. `Authorization: Bearer <token>` when `bearer` is set
/// 2. `Authorization: <name>=<token>` entries separated by `,` or `;`
/// 3. A header named after each allowed name
pub(crate) fn extract<R: RequestContext + ?Sized>(
    req: &R,
    source: TokenSource,
    names: &[String],
    bearer: bool,
) -> Option<Candidate> {
    match source {
        TokenSource::Header => extract_header(req, names, bearer),
        TokenSource::Cookie => names
            .iter()
            .find_map(|name| Candidate::new(name, &req.cookie(name)?)),
        TokenSource::Query => names
            .iter()
            .find_map(|name| Candidate::new(name, &req.query(name)?)),
    }
}

fn extract_header<R: RequestContext + ?Sized>(
    req: &R,
    names: &[String],
    bearer: bool,
) -> Option<Candidate> {
    if let Some(authorization) = req.header("authorization") {
        if bearer {
            if let Some(token) = strip_bearer(authorization) {
                if let Some(candidate) = Candidate::new(BEARER_TOKEN_NAME, token) {
                    return Some(candidate);
                }
            }
        }

        let entries: Vec<(&str, &str)> = authorization
            .split([',', ';'])
            .filter_map(|entry| entry.trim().split_once('='))
            .map(|(k, v)| (k.trim(), v))
            .collect();
        let found = names.iter().find_map(|name| {
            entries
                .iter()
                .find(|(key, _)| *key == name.as_str())
                .and_then(|(_, value)| Candidate::new(name, value))
        });
        if found.is_some() {
            return found;
        }
    }

    names
        .iter()
        .find_map(|name| Candidate::new(name, req.header(name)?))
}

fn strip_bearer(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}
