//! End-to-end authorization through `TokenValidator::authorize`
//!
//! Every test signs a persona with the shared HS512 fixture, places the token
//! in the `Authorization` header and runs it against an access list.

use authz::kms::Key;
use authz::{AccessList, AuthError, TokenError, TokenValidator, TokenValidatorOptions, User};
use authz_test_utils::{
    access_list, editor, editor_with_role, test_key_managers, test_sign_key, test_verify_keys, viewer,
    viewer_with_path_acl, viewer_with_role, TestClaimsBuilder, TestRequestBuilder,
};
use axum::body::Body;
use axum::http::Request;
use serde_json::Value;

// ============================================================================
// Access lists
// ============================================================================

fn default_deny_acl() -> AccessList {
    access_list(&[(&["match scopes read:books"], "allow log")])
}

fn default_allow_acl() -> AccessList {
    access_list(&[
        (&["match scopes write:books"], "deny"),
        (&["always match scopes any"], "allow"),
    ])
}

fn audience_default_deny_acl() -> AccessList {
    access_list(&[(&["match aud https://127.0.0.1:2019/"], "allow")])
}

fn audience_default_allow_acl() -> AccessList {
    access_list(&[
        (&["match aud https://localhost/"], "deny"),
        (&["always match audience any"], "allow"),
    ])
}

fn custom_acl() -> AccessList {
    access_list(&[
        (
            &["match scope write:books", "match method GET", "match path /app/page1/blocked"],
            "deny",
        ),
        (
            &["match scope write:books", "match method GET", "match path /app/page2/blocked"],
            "deny",
        ),
        (
            &["match scope write:books", "match method GET", "match path /app/page3/allowed"],
            "allow",
        ),
        (&["match scope read:books"], "allow"),
    ])
}

fn mixed_acl() -> AccessList {
    access_list(&[
        (&["match scope write:books"], "allow"),
        (&["match audience https://127.0.0.1:2019/"], "allow"),
    ])
}

fn default_roles_deny_acl() -> AccessList {
    access_list(&[(&["match role viewer"], "allow")])
}

fn default_roles_allow_acl() -> AccessList {
    access_list(&[
        (&["match role editor"], "deny"),
        (&["always match role any"], "allow"),
    ])
}

fn custom_roles_acl() -> AccessList {
    access_list(&[
        (
            &["match role editor", "match method GET", "match path /app/page1/blocked"],
            "deny log",
        ),
        (
            &["match role editor", "match method GET", "match path /app/page2/blocked"],
            "deny log",
        ),
        (
            &["match role editor", "match method GET", "match path /app/page3/allowed"],
            "allow log",
        ),
        (&["match role viewer"], "allow log"),
    ])
}

// ============================================================================
// Helper Functions
// ============================================================================

fn sign(claims: Value) -> String {
    let mut user = User::from_value(claims).expect("persona claims");
    test_sign_key()
        .sign_token("HS512", &mut user)
        .expect("HS512 fixture signs");
    user.token
}

fn options() -> TokenValidatorOptions {
    TokenValidatorOptions {
        validate_method_path: true,
        ..Default::default()
    }
}

fn validator(keys: &[Key], acl: Option<AccessList>, options: TokenValidatorOptions) -> TokenValidator {
    let validator = TokenValidator::new();
    validator
        .configure(keys, acl, options)
        .expect("validator configures");
    validator
}

fn request(token: &str, path: &str, bearer: bool) -> Request<Body> {
    let builder = TestRequestBuilder::get(path);
    if bearer {
        builder.bearer(token).build()
    } else {
        builder.authorization("access_token", token).build()
    }
}

/// Sign `persona`, authorize it and check the outcome. On success the
/// returned identity must carry exactly the persona's claims.
fn check(
    persona: TestClaimsBuilder,
    acl: AccessList,
    opts: TokenValidatorOptions,
    path: &str,
    expected: Result<(), AuthError>,
) {
    let claims = persona.build();
    let token = sign(claims.clone());
    let validator = validator(&test_verify_keys(), Some(acl), opts);
    let bearer = opts.validate_bearer_header;

    let result = validator.authorize(&request(&token, path, bearer));
    match (result, expected) {
        (Ok(user), Ok(())) => {
            let want = User::from_value(claims).expect("persona claims");
            assert_eq!(user.claims, want.claims, "claims mismatch at {path}");
            assert_eq!(user.token, token);
            let name = if bearer { "bearer" } else { "access_token" };
            assert_eq!(user.token_name, name);
        }
        (Err(got), Err(want)) => assert_eq!(got, want, "unexpected error at {path}"),
        (got, want) => panic!("at {path}: expected {want:?}, got {got:?}"),
    }
}

// ============================================================================
// Scope and audience access lists
// ============================================================================

#[test]
fn test_default_deny_allows_reader_only() {
    check(viewer(), default_deny_acl(), options(), "/app/page", Ok(()));
    check(
        editor(),
        default_deny_acl(),
        options(),
        "/app/page",
        Err(AuthError::AccessNotAllowed),
    );
}

#[test]
fn test_default_allow_denies_writer_only() {
    check(viewer(), default_allow_acl(), options(), "/app/page", Ok(()));
    check(
        editor(),
        default_allow_acl(),
        options(),
        "/app/page",
        Err(AuthError::AccessNotAllowed),
    );
}

#[test]
fn test_audience_access_lists() {
    for acl in [audience_default_deny_acl, audience_default_allow_acl] {
        check(viewer(), acl(), options(), "/app/page", Ok(()));
        check(
            editor(),
            acl(),
            options(),
            "/app/page",
            Err(AuthError::AccessNotAllowed),
        );
    }
}

#[test]
fn test_custom_acl_with_method_and_path() {
    for path in ["/app/page1/blocked", "/app/page2/blocked", "/app/page3/allowed"] {
        check(viewer(), custom_acl(), options(), path, Ok(()));
    }
    for path in ["/app/page1/blocked", "/app/page2/blocked"] {
        check(
            editor(),
            custom_acl(),
            options(),
            path,
            Err(AuthError::AccessNotAllowed),
        );
    }
    check(editor(), custom_acl(), options(), "/app/page3/allowed", Ok(()));
}

#[test]
fn test_method_path_conditions_ignored_when_disabled() {
    // With method/path validation off the editor's deny rules never match
    // and nothing else admits a writer.
    let opts = TokenValidatorOptions::default();
    check(
        editor(),
        custom_acl(),
        opts,
        "/app/page3/allowed",
        Err(AuthError::AccessNotAllowed),
    );
}

#[test]
fn test_mixed_acl() {
    check(viewer(), mixed_acl(), options(), "/app/page", Ok(()));
    check(editor(), mixed_acl(), options(), "/app/page", Ok(()));
}

// ============================================================================
// Role access lists (bearer header)
// ============================================================================

fn bearer_options() -> TokenValidatorOptions {
    TokenValidatorOptions {
        validate_bearer_header: true,
        ..options()
    }
}

#[test]
fn test_default_roles_access_lists() {
    for acl in [default_roles_deny_acl, default_roles_allow_acl] {
        for path in ["/app/viewer", "/app/editor", "/app/admin"] {
            check(viewer_with_role(), acl(), bearer_options(), path, Ok(()));
            check(
                editor_with_role(),
                acl(),
                bearer_options(),
                path,
                Err(AuthError::AccessNotAllowed),
            );
        }
    }
}

#[test]
fn test_custom_roles_acl() {
    for path in ["/app/page1/blocked", "/app/page2/blocked"] {
        check(
            editor_with_role(),
            custom_roles_acl(),
            bearer_options(),
            path,
            Err(AuthError::AccessNotAllowed),
        );
    }
    check(
        editor_with_role(),
        custom_roles_acl(),
        bearer_options(),
        "/app/page3/allowed",
        Ok(()),
    );
    for path in ["/app/page1/blocked", "/app/page2/blocked", "/app/page3/allowed"] {
        check(viewer_with_role(), custom_roles_acl(), bearer_options(), path, Ok(()));
    }
}

#[test]
fn test_token_path_acl() {
    let opts = TokenValidatorOptions {
        validate_access_list_path_claim: true,
        ..bearer_options()
    };
    check(
        viewer_with_path_acl(),
        default_roles_deny_acl(),
        opts,
        "/app/page3/allowed",
        Ok(()),
    );
    check(
        viewer_with_path_acl(),
        default_roles_deny_acl(),
        opts,
        "/app/page2/blocked",
        Err(AuthError::AccessNotAllowedByPathAcl),
    );
}

#[test]
fn test_token_path_acl_ignored_when_disabled() {
    check(
        viewer_with_path_acl(),
        default_roles_deny_acl(),
        bearer_options(),
        "/app/page2/blocked",
        Ok(()),
    );
}

// ============================================================================
// Source address binding
// ============================================================================

#[test]
fn test_source_address_missing_from_token() {
    let opts = TokenValidatorOptions {
        validate_source_address: true,
        ..options()
    };
    check(
        viewer(),
        default_deny_acl(),
        opts,
        "/app/page",
        Err(AuthError::SourceAddressNotFound),
    );
}

#[test]
fn test_source_address_mismatch_and_match() {
    let opts = TokenValidatorOptions {
        validate_source_address: true,
        ..bearer_options()
    };
    let validator = validator(&test_verify_keys(), Some(default_roles_allow_acl()), opts);
    let token = sign(viewer_with_role().build());

    let req = TestRequestBuilder::get("/app/viewer")
        .bearer(&token)
        .real_ip("20.20.20.20")
        .build();
    assert_eq!(
        validator.authorize(&req),
        Err(AuthError::SourceAddressMismatch {
            token: "10.10.10.10".to_string(),
            request: "20.20.20.20".to_string(),
        })
    );

    let req = TestRequestBuilder::get("/app/viewer")
        .bearer(&token)
        .real_ip("10.10.10.10")
        .build();
    assert!(validator.authorize(&req).is_ok());
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_no_access_list() {
    let validator = validator(&test_verify_keys(), None, options());
    let token = sign(viewer().build());
    let req = request(&token, "/app/page", false);

    assert_eq!(validator.authorize(&req), Err(AuthError::NoAccessList));
    // Authentication alone does not need a list.
    assert!(validator.authenticate(&req).is_ok());
}

#[test]
fn test_access_list_without_rules() {
    let validator = validator(&test_verify_keys(), Some(AccessList::new()), options());
    let token = sign(viewer().build());

    assert_eq!(
        validator.authorize(&request(&token, "/app/page", false)),
        Err(AuthError::AccessListNoRules)
    );
}

#[test]
fn test_empty_token() {
    let validator = validator(&test_verify_keys(), Some(default_deny_acl()), options());
    let req = request("", "/app/page", false);

    assert_eq!(validator.authorize(&req), Err(AuthError::NoTokenFound));
}

#[test]
fn test_no_token_at_all() {
    let validator = validator(&test_verify_keys(), Some(default_deny_acl()), options());
    let req = TestRequestBuilder::get("/app/page").build();

    assert_eq!(validator.authorize(&req), Err(AuthError::NoTokenFound));
}

#[test]
fn test_malformed_token() {
    let validator = validator(&test_verify_keys(), Some(default_deny_acl()), options());
    let req = request(r#"{"foobar", "barfoo"}"#, "/app/page", false);

    let err = validator.authorize(&req).expect_err("malformed token must fail");
    assert!(
        matches!(err, AuthError::InvalidToken(TokenError::ParseFailed(_))),
        "got {err:?}"
    );
}

#[test]
fn test_expired_token() {
    let validator = validator(&test_verify_keys(), Some(default_deny_acl()), options());
    let token = sign(viewer().expires_in(-3600).build());

    assert_eq!(
        validator.authorize(&request(&token, "/app/page", false)),
        Err(AuthError::InvalidToken(TokenError::Expired))
    );
}

#[test]
fn test_token_signed_with_other_secret() {
    let validator = validator(&test_verify_keys(), Some(default_deny_acl()), options());
    let mut user = viewer().build_user();
    let other = authz::kms::get_sign_keys(&test_key_managers("HS512", "some-other-secret"));
    other
        .first()
        .expect("sign key")
        .sign_token("HS512", &mut user)
        .expect("signs");

    assert_eq!(
        validator.authorize(&request(&user.token, "/app/page", false)),
        Err(AuthError::InvalidToken(TokenError::SignatureInvalid))
    );
}

#[test]
fn test_unconfigured_validator() {
    let validator = TokenValidator::new();
    let token = sign(viewer().build());

    assert_eq!(
        validator.authorize(&request(&token, "/app/page", false)),
        Err(AuthError::NoKeys)
    );
}

#[test]
fn test_configure_without_keys() {
    let validator = TokenValidator::new();
    assert_eq!(
        validator.configure(&[], Some(default_deny_acl()), options()),
        Err(AuthError::NoKeys)
    );
}
