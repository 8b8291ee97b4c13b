//! Access control list engine.
//!
//! An [`AccessList`] is an ordered sequence of rules. Each rule is an
//! AND of [`Condition`]s plus an action. Evaluation walks the rules in
//! insertion order and the first rule whose conditions all hold decides:
//! later rules are never consulted. If nothing matches the request is denied.
//!
//! ```rust,ignore
//! let mut acl = AccessList::new();
//! acl.add_rules(&[
//!     RuleConfig::new(["match scopes write:books", "match method GET"], "deny log"),
//!     RuleConfig::new(["always match roles any"], "allow"),
//! ])?;
//! acl.authorize(&AclContext::new(&user.claims))?;
//! ```

pub mod audit;
pub mod condition;
pub mod path;

pub use audit::{AuditEntry, AuditSink, ChannelAuditSink, TracingAuditSink};
pub use condition::{Condition, Field};

use crate::errors::AuthError;
use crate::observability::metrics;
use crate::user::Claims;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Serializable rule definition as accepted by [`AccessList::add_rules`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub conditions: Vec<String>,
    pub action: String,
}

impl RuleConfig {
    pub fn new<I, S>(conditions: I, action: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            comment: None,
            conditions: conditions.into_iter().map(Into::into).collect(),
            action: action.to_string(),
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Allow or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Verdict {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
        }
    }
}

/// A rule's action: a verdict plus whether to audit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub verdict: Verdict,
    pub log: bool,
}

impl Action {
    fn parse(action: &str) -> Option<Self> {
        let words: Vec<&str> = action.split_whitespace().collect();
        let (verdict, log) = match words.as_slice() {
            [verdict] => (*verdict, false),
            [verdict, "log"] => (*verdict, true),
            _ => return None,
        };
        let verdict = match verdict {
            "allow" => Verdict::Allow,
            "deny" => Verdict::Deny,
            _ => return None,
        };
        Some(Self { verdict, log })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verdict.as_str())?;
        if self.log {
            f.write_str(" log")?;
        }
        Ok(())
    }
}

/// A validated rule. Immutable once added.
#[derive(Debug, Clone)]
pub struct Rule {
    comment: Option<String>,
    conditions: Vec<Condition>,
    action: Action,
}

impl Rule {
    fn from_config(index: usize, config: &RuleConfig) -> Result<Self, AuthError> {
        if config.conditions.is_empty() {
            return Err(AuthError::RuleNoConditions { index });
        }
        let action = Action::parse(&config.action).ok_or_else(|| AuthError::InvalidRuleAction {
            index,
            action: config.action.clone(),
        })?;
        let conditions = config
            .conditions
            .iter()
            .map(|c| {
                Condition::parse(c).map_err(|reason| AuthError::InvalidRuleCondition {
                    index,
                    condition: c.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            comment: config.comment.clone(),
            conditions,
            action,
        })
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    fn matches(&self, ctx: &AclContext<'_>) -> bool {
        self.conditions.iter().all(|c| c.matches(ctx))
    }
}

/// What a rule is evaluated against.
///
/// `method` and `path` are only set when the validator runs with method/path
/// validation enabled; conditions on them never match otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AclContext<'a> {
    pub claims: &'a Claims,
    pub method: Option<&'a str>,
    pub path: Option<&'a str>,
}

impl<'a> AclContext<'a> {
    #[must_use]
    pub fn new(claims: &'a Claims) -> Self {
        Self {
            claims,
            method: None,
            path: None,
        }
    }

    #[must_use]
    pub fn with_request(mut self, method: &'a str, path: &'a str) -> Self {
        self.method = Some(method);
        self.path = Some(path);
        self
    }
}

/// Ordered rule list with an optional shared audit sink.
#[derive(Clone, Default)]
pub struct AccessList {
    rules: Vec<Rule>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl fmt::Debug for AccessList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessList")
            .field("rules", &self.rules)
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

impl AccessList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an audit sink used by `log` rules.
    pub fn set_audit_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.audit = Some(sink);
    }

    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.set_audit_sink(sink);
        self
    }

    /// Validate and append rules.
    ///
    /// Either every rule is appended or none is. Rule indices in errors are
    /// positions within `rules`.
    ///
    /// # Errors
    ///
    /// - `RuleNoConditions` - a rule has an empty condition list
    /// - `InvalidRuleAction` - action is not `allow` / `deny`, optionally
    ///   followed by `log`
    /// - `InvalidRuleCondition` - a condition failed to parse
    pub fn add_rules(&mut self, rules: &[RuleConfig]) -> Result<(), AuthError> {
        let parsed = rules
            .iter()
            .enumerate()
            .map(|(index, config)| Rule::from_config(index, config))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            target: "authz.acl",
            added = parsed.len(),
            total = self.rules.len() + parsed.len(),
            "Rules added to access list"
        );
        self.rules.extend(parsed);
        Ok(())
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate the rules against an identity and request context.
    ///
    /// # Errors
    ///
    /// - `AccessListNoRules` - the list is empty
    /// - `AccessNotAllowed` - a deny rule matched, or no rule matched
    pub fn authorize(&self, ctx: &AclContext<'_>) -> Result<(), AuthError> {
        if self.rules.is_empty() {
            return Err(AuthError::AccessListNoRules);
        }

        let Some((index, rule)) = self.rules.iter().enumerate().find(|(_, r)| r.matches(ctx))
        else {
            tracing::debug!(target: "authz.acl", "No rule matched, denying");
            metrics::record_acl_decision(Verdict::Deny.as_str());
            return Err(AuthError::AccessNotAllowed);
        };

        let verdict = rule.action.verdict;
        tracing::debug!(
            target: "authz.acl",
            rule_index = index,
            decision = verdict.as_str(),
            "Rule matched"
        );
        metrics::record_acl_decision(verdict.as_str());

        if rule.action.log {
            if let Some(sink) = &self.audit {
                sink.record(audit_entry(index, rule, ctx));
            }
        }

        match verdict {
            Verdict::Allow => Ok(()),
            Verdict::Deny => Err(AuthError::AccessNotAllowed),
        }
    }
}

fn audit_entry(index: usize, rule: &Rule, ctx: &AclContext<'_>) -> AuditEntry {
    AuditEntry {
        decision: rule.action.verdict.as_str(),
        rule_index: index,
        comment: rule.comment.clone(),
        conditions: rule.conditions.iter().map(ToString::to_string).collect(),
        subject: ctx.claims.subject.clone(),
        email: ctx.claims.email.clone(),
        roles: ctx.claims.roles.clone(),
        scopes: ctx.claims.scopes.clone(),
        method: ctx.method.map(ToString::to_string),
        path: ctx.path.map(ToString::to_string),
    }
}
