//! Metrics definitions for the authorization pipeline.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authz_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! - `status`: 2 values (success, error)
//! - `error_category`: 4 values (configuration, authentication, authorization, none)
//! - `decision`: 2 values (allow, deny)

use metrics::counter;

/// Record the outcome of one `authorize` / `authenticate` call.
///
/// Metric: `authz_authorizations_total`
/// Labels: `status`, `error_category`
pub fn record_authorization(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("authz_authorizations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

/// Record an access list verdict.
///
/// Metric: `authz_acl_decisions_total`
/// Labels: `decision`
pub fn record_acl_decision(decision: &str) {
    counter!("authz_acl_decisions_total", "decision" => decision.to_string()).increment(1);
}

/// Record an audit entry dropped because the sink could not accept it.
///
/// Metric: `authz_audit_dropped_total`
pub fn record_audit_dropped() {
    counter!("authz_audit_dropped_total").increment(1);
}
