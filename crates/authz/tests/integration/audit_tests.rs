//! Audit records emitted by `log` rules during request authorization

use authz::acl::ChannelAuditSink;
use authz::{AccessList, AuthError, RuleConfig, TokenValidator, TokenValidatorOptions};
use authz_test_utils::{
    editor_with_role, guest, guest_access_list_with_sink, test_sign_key, test_verify_keys,
    RecordingAuditSink, TestRequestBuilder,
};
use std::sync::Arc;
use std::time::Duration;

fn validator(acl: AccessList) -> TokenValidator {
    let validator = TokenValidator::new();
    validator
        .configure(
            &test_verify_keys(),
            Some(acl),
            TokenValidatorOptions {
                validate_method_path: true,
                ..Default::default()
            },
        )
        .expect("validator configures");
    validator
}

#[test]
fn test_logged_allow_and_deny_are_recorded() {
    let (acl, sink) = guest_access_list_with_sink();
    let validator = validator(acl);

    let guest_token = guest().signed_with(&test_sign_key()).token;
    let req = TestRequestBuilder::get("/books").cookie("access_token", &guest_token).build();
    assert!(validator.authorize(&req).is_ok());

    let editor_token = editor_with_role().signed_with(&test_sign_key()).token;
    let req = TestRequestBuilder::get("/books").cookie("access_token", &editor_token).build();
    assert_eq!(validator.authorize(&req), Err(AuthError::AccessNotAllowed));

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);

    let allowed = &entries[0];
    assert_eq!(allowed.decision, "allow");
    assert_eq!(allowed.rule_index, 0);
    assert_eq!(allowed.roles, vec!["anonymous", "guest"]);
    assert_eq!(allowed.method.as_deref(), Some("GET"));
    assert_eq!(allowed.path.as_deref(), Some("/books"));

    let denied = &entries[1];
    assert_eq!(denied.decision, "deny");
    assert_eq!(denied.rule_index, 1);
    assert_eq!(denied.subject.as_deref(), Some("jane.smith@outlook.com"));
    assert_eq!(denied.conditions, vec!["always match roles any"]);
}

#[test]
fn test_unlogged_rules_are_silent() {
    let sink = Arc::new(RecordingAuditSink::default());
    let mut acl = AccessList::new();
    acl.set_audit_sink(sink.clone());
    acl.add_rules(&[RuleConfig::new(["match roles anonymous"], "allow")])
        .expect("rule parses");
    let validator = validator(acl);

    let token = guest().signed_with(&test_sign_key()).token;
    let req = TestRequestBuilder::get("/").cookie("access_token", &token).build();
    assert!(validator.authorize(&req).is_ok());
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_channel_sink_delivers_entries() {
    let (sink, mut rx) = ChannelAuditSink::new(8);
    let mut acl = AccessList::new().with_audit_sink(Arc::new(sink));
    acl.add_rules(&[
        RuleConfig::new(["match roles editor"], "deny log").with_comment("writers are read-only here"),
    ])
    .expect("rule parses");
    let validator = validator(acl);

    let token = editor_with_role().signed_with(&test_sign_key()).token;
    let req = TestRequestBuilder::get("/admin").cookie("access_token", &token).build();
    assert_eq!(validator.authorize(&req), Err(AuthError::AccessNotAllowed));

    let entry = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("entry delivered in time")
        .expect("channel open");
    assert_eq!(entry.decision, "deny");
    assert_eq!(entry.comment.as_deref(), Some("writers are read-only here"));
    assert_eq!(entry.path.as_deref(), Some("/admin"));
}

#[tokio::test]
async fn test_channel_sink_drops_when_full() {
    let (sink, mut rx) = ChannelAuditSink::new(1);
    let mut acl = AccessList::new().with_audit_sink(Arc::new(sink));
    acl.add_rules(&[RuleConfig::new(["match roles editor"], "deny log")])
        .expect("rule parses");
    let validator = validator(acl);

    let token = editor_with_role().signed_with(&test_sign_key()).token;
    for _ in 0..3 {
        let req = TestRequestBuilder::get("/").cookie("access_token", &token).build();
        // Decisions never wait on the consumer.
        assert_eq!(validator.authorize(&req), Err(AuthError::AccessNotAllowed));
    }

    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err());
}
