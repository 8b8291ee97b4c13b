//! Rule conditions.
//!
//! A condition is written as `[<mode>] match <field> <value>...`:
//!
//! ```text
//! match roles viewer editor          any role equals viewer or editor
//! exact match roles anonymous guest  role set is exactly {anonymous, guest}
//! partial match email @example.com   some email contains the value
//! prefix match path /api/            path starts with /api/
//! suffix match aud .internal/        some audience ends with .internal/
//! regex match sub ^svc-[0-9]+$       some subject matches the regex
//! always match scopes any            unconditionally true
//! ```
//!
//! `match path` values are segment-wise globs (see [`super::path`]). Every
//! other field compares strings exactly.

use super::path::path_glob_set;
use super::AclContext;
use globset::GlobSet;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// What part of the identity or request a condition inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Roles,
    Scopes,
    Audience,
    Method,
    Path,
    /// Any other top-level claim, by key.
    Claim(String),
}

impl Field {
    fn parse(name: &str) -> Self {
        match name {
            "role" | "roles" | "group" | "groups" => Field::Roles,
            "scope" | "scopes" => Field::Scopes,
            "aud" | "audience" => Field::Audience,
            "method" => Field::Method,
            "path" => Field::Path,
            other => Field::Claim(other.to_string()),
        }
    }

    fn values<'a>(&self, ctx: &AclContext<'a>) -> Cow<'a, [String]> {
        match self {
            Field::Roles => Cow::Borrowed(ctx.claims.roles.as_slice()),
            Field::Scopes => Cow::Borrowed(ctx.claims.scopes.as_slice()),
            Field::Audience => Cow::Borrowed(ctx.claims.audience.as_slice()),
            Field::Method => Cow::Owned(ctx.method.map(ToString::to_string).into_iter().collect()),
            Field::Path => Cow::Owned(ctx.path.map(ToString::to_string).into_iter().collect()),
            Field::Claim(key) => Cow::Owned(ctx.claims.values(key)),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Roles => f.write_str("roles"),
            Field::Scopes => f.write_str("scopes"),
            Field::Audience => f.write_str("aud"),
            Field::Method => f.write_str("method"),
            Field::Path => f.write_str("path"),
            Field::Claim(key) => f.write_str(key),
        }
    }
}

/// Compiled comparison, one variant per match mode.
#[derive(Debug, Clone)]
enum Matcher {
    Always,
    /// Some field value equals some listed value.
    AnyOf(BTreeSet<String>),
    /// Field values as a set equal the listed values as a set.
    Exactly(BTreeSet<String>),
    Partial(Vec<String>),
    Prefix(Vec<String>),
    Suffix(Vec<String>),
    Regex(Vec<Regex>),
    Glob(GlobSet),
}

/// A single parsed condition. Conditions within a rule are AND-combined.
#[derive(Debug, Clone)]
pub struct Condition {
    field: Field,
    matcher: Matcher,
    source: String,
}

impl Condition {
    /// Parse a condition string.
    ///
    /// Errors are returned as a human-readable reason; the caller attaches
    /// the rule index.
    pub(crate) fn parse(source: &str) -> Result<Self, String> {
        let mut words = source.split_whitespace();
        let mode = match words.next() {
            Some("match") => "match",
            Some(mode @ ("always" | "exact" | "partial" | "prefix" | "suffix" | "regex")) => {
                if words.next() != Some("match") {
                    return Err(format!("expected \"match\" after \"{mode}\""));
                }
                mode
            }
            Some(other) => return Err(format!("unsupported match mode \"{other}\"")),
            None => return Err("empty condition".to_string()),
        };

        let field = words
            .next()
            .map(Field::parse)
            .ok_or_else(|| "missing field name".to_string())?;
        let values: Vec<String> = words.map(ToString::to_string).collect();

        if values.is_empty() && mode != "always" {
            return Err(format!("no values to match against {field}"));
        }

        let matcher = match mode {
            "always" => Matcher::Always,
            "exact" => Matcher::Exactly(values.into_iter().collect()),
            "partial" => Matcher::Partial(values),
            "prefix" => Matcher::Prefix(values),
            "suffix" => Matcher::Suffix(values),
            "regex" => Matcher::Regex(
                values
                    .iter()
                    .map(|v| Regex::new(v).map_err(|e| format!("invalid regex {v:?}: {e}")))
                    .collect::<Result<_, _>>()?,
            ),
            _ if field == Field::Path => Matcher::Glob(
                path_glob_set(values.iter().map(String::as_str))
                    .map_err(|e| format!("invalid path pattern: {e}"))?,
            ),
            _ => Matcher::AnyOf(values.into_iter().collect()),
        };

        Ok(Self {
            field,
            matcher,
            source: source.split_whitespace().collect::<Vec<_>>().join(" "),
        })
    }

    #[must_use]
    pub fn field(&self) -> &Field {
        &self.field
    }

    #[must_use]
    pub fn is_always(&self) -> bool {
        matches!(self.matcher, Matcher::Always)
    }

    /// Evaluate against an identity and request context.
    ///
    /// A field with no values (e.g. `method` when method/path validation is
    /// off) never matches except under `always`.
    pub(crate) fn matches(&self, ctx: &AclContext<'_>) -> bool {
        if let Matcher::Always = self.matcher {
            return true;
        }
        let values = self.field.values(ctx);
        match &self.matcher {
            Matcher::Always => true,
            Matcher::AnyOf(wanted) => values.iter().any(|v| wanted.contains(v)),
            Matcher::Exactly(wanted) => {
                !values.is_empty() && values.iter().cloned().collect::<BTreeSet<_>>() == *wanted
            }
            Matcher::Partial(wanted) => values
                .iter()
                .any(|v| wanted.iter().any(|w| v.contains(w.as_str()))),
            Matcher::Prefix(wanted) => values
                .iter()
                .any(|v| wanted.iter().any(|w| v.starts_with(w.as_str()))),
            Matcher::Suffix(wanted) => values
                .iter()
                .any(|v| wanted.iter().any(|w| v.ends_with(w.as_str()))),
            Matcher::Regex(patterns) => values
                .iter()
                .any(|v| patterns.iter().any(|re| re.is_match(v))),
            Matcher::Glob(set) => values.iter().any(|v| set.is_match(v.as_str())),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
