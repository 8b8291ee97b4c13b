//! Audit emission for `log`-modified rules.
//!
//! The access list holds an `Arc<dyn AuditSink>` it does not own. Sinks must
//! not block: [`ChannelAuditSink`] hands entries to a bounded channel and
//! drops them when the consumer falls behind.

use crate::observability::metrics;
use serde::Serialize;
use tokio::sync::mpsc;

/// One audited ACL decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// `allow` or `deny`.
    pub decision: &'static str,
    /// Position of the matched rule in the access list.
    pub rule_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub conditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    /// Accept an entry. Must return promptly.
    fn record(&self, entry: AuditEntry);
}

/// Emits each entry as an `info` event on target `authz.acl.audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "authz.acl.audit",
            decision = entry.decision,
            rule_index = entry.rule_index,
            comment = entry.comment.as_deref().unwrap_or(""),
            conditions = ?entry.conditions,
            subject = entry.subject.as_deref().unwrap_or(""),
            email = entry.email.as_deref().unwrap_or(""),
            roles = ?entry.roles,
            scopes = ?entry.scopes,
            method = entry.method.as_deref().unwrap_or(""),
            path = entry.path.as_deref().unwrap_or(""),
            "acl decision"
        );
    }
}

/// Forwards entries to a bounded channel.
///
/// A full or closed channel drops the entry and increments
/// `authz_audit_dropped_total`.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: mpsc::Sender<AuditEntry>,
}

impl ChannelAuditSink {
    /// Create a sink and the receiver its entries are delivered to.
    ///
    /// A `capacity` of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "full",
                mpsc::error::TrySendError::Closed(_) => "closed",
            };
            tracing::warn!(target: "authz.acl.audit", reason, "Audit entry dropped");
            metrics::record_audit_dropped();
        }
    }
}
