//! Access list fixtures and a recording audit sink

use authz::acl::{AccessList, AuditEntry, AuditSink, RuleConfig};
use std::sync::{Arc, Mutex};

/// Build an access list from `(conditions, action)` pairs.
pub fn access_list(rules: &[(&[&str], &str)]) -> AccessList {
    let configs: Vec<RuleConfig> = rules
        .iter()
        .map(|(conditions, action)| RuleConfig::new(conditions.iter().copied(), action))
        .collect();
    let mut acl = AccessList::new();
    acl.add_rules(&configs).expect("fixture rules must parse");
    acl
}

/// Guests may read; everybody else is denied with an audit record.
pub fn guest_access_list() -> AccessList {
    access_list(&[
        (&["match roles anonymous guest"], "allow log"),
        (&["always match roles any"], "deny log"),
    ])
}

/// [`guest_access_list`] wired to a fresh [`RecordingAuditSink`].
pub fn guest_access_list_with_sink() -> (AccessList, Arc<RecordingAuditSink>) {
    let sink = Arc::new(RecordingAuditSink::default());
    let acl = guest_access_list().with_audit_sink(sink.clone());
    (acl, sink)
}

/// Keeps every audit entry in memory for later assertions.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAuditSink {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit sink poisoned").clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().expect("audit sink poisoned").push(entry);
    }
}
