//! Token names, source priority and extraction from each source

use authz::{AuthError, TokenSource, TokenValidator, TokenValidatorOptions};
use authz_test_utils::{guest, guest_access_list, test_sign_key, test_verify_keys, TestRequestBuilder};

fn configured() -> TokenValidator {
    let validator = TokenValidator::new();
    validator
        .configure(
            &test_verify_keys(),
            Some(guest_access_list()),
            TokenValidatorOptions::default(),
        )
        .expect("validator configures");
    validator
}

fn guest_token() -> String {
    guest().signed_with(&test_sign_key()).token
}

// ============================================================================
// Allowed token names
// ============================================================================

#[test]
fn test_set_allowed_token_names_rejections() {
    let validator = TokenValidator::new();
    let empty: [&str; 0] = [];

    assert_eq!(
        validator.set_allowed_token_names(&empty),
        Err(AuthError::TokenNamesNotFound)
    );
    assert_eq!(
        validator.set_allowed_token_names(&["foo", "foo"]),
        Err(AuthError::DuplicateTokenName("foo".to_string()))
    );
    assert_eq!(
        validator.set_allowed_token_names(&["foo", ""]),
        Err(AuthError::EmptyTokenName)
    );

    // Rejected calls leave the defaults in place.
    for source in TokenSource::ALL {
        assert_eq!(
            validator.allowed_token_names(source),
            vec!["access_token", "jwt_access_token"]
        );
    }
}

#[test]
fn test_set_allowed_token_names_applies_to_every_source() {
    let validator = TokenValidator::new();
    validator
        .set_allowed_token_names(&["foo", "bar"])
        .expect("valid names");

    for source in TokenSource::ALL {
        assert_eq!(validator.allowed_token_names(source), vec!["foo", "bar"]);
    }
}

#[test]
fn test_custom_token_name_is_extracted() {
    let validator = configured();
    validator.set_allowed_token_names(&["session"]).expect("valid names");
    let token = guest_token();

    let req = TestRequestBuilder::get("/").cookie("session", &token).build();
    let user = validator.authorize(&req).expect("session cookie accepted");
    assert_eq!(user.token_name, "session");

    // The old default name is no longer looked at.
    let req = TestRequestBuilder::get("/").cookie("access_token", &token).build();
    assert_eq!(validator.authorize(&req), Err(AuthError::NoTokenFound));
}

// ============================================================================
// Source priority
// ============================================================================

#[test]
fn test_set_source_priority_rejections() {
    let validator = TokenValidator::new();
    let empty: [&str; 0] = [];

    assert_eq!(
        validator.set_source_priority(&empty),
        Err(AuthError::InvalidSourcePriority)
    );
    assert_eq!(
        validator.set_source_priority(&["foo", "foo", "foo", "foo"]),
        Err(AuthError::InvalidSourcePriority)
    );
    assert_eq!(
        validator.set_source_priority(&["header", "cookie", "foo"]),
        Err(AuthError::InvalidSourceName("foo".to_string()))
    );
    assert_eq!(
        validator.set_source_priority(&["header", "query", "query"]),
        Err(AuthError::DuplicateSourceName("query".to_string()))
    );
    assert_eq!(
        validator.source_priority(),
        vec![TokenSource::Cookie, TokenSource::Header, TokenSource::Query]
    );
}

#[test]
fn test_set_source_priority_accepts_permutation() {
    let validator = TokenValidator::new();
    validator
        .set_source_priority(&["header", "cookie", "query"])
        .expect("valid priority");

    assert_eq!(
        validator.source_priority(),
        vec![TokenSource::Header, TokenSource::Cookie, TokenSource::Query]
    );
}

#[test]
fn test_source_priority_decides_between_sources() {
    let validator = configured();
    let token = guest_token();
    let req = TestRequestBuilder::get("/")
        .query("jwt_access_token", &token)
        .cookie("access_token", "not-a-token")
        .build();

    // Default priority consults the cookie first and its garbage wins.
    assert!(matches!(
        validator.authorize(&req),
        Err(AuthError::InvalidToken(_))
    ));

    validator
        .set_source_priority(&["query", "header", "cookie"])
        .expect("valid priority");
    let user = validator.authorize(&req).expect("query token accepted");
    assert_eq!(user.token_name, "jwt_access_token");
}

// ============================================================================
// Extraction per source
// ============================================================================

#[test]
fn test_token_from_query() {
    let validator = configured();
    let req = TestRequestBuilder::get("/app")
        .query("access_token", &guest_token())
        .build();

    let user = validator.authorize(&req).expect("query token accepted");
    assert_eq!(user.token_name, "access_token");
}

#[test]
fn test_token_from_named_header() {
    let validator = configured();
    let req = TestRequestBuilder::get("/app")
        .header("access_token", &guest_token())
        .build();

    assert!(validator.authorize(&req).is_ok());
}

#[test]
fn test_bearer_only_when_enabled() {
    let validator = configured();
    let req = TestRequestBuilder::get("/app").bearer(&guest_token()).build();
    assert_eq!(validator.authorize(&req), Err(AuthError::NoTokenFound));

    validator
        .configure(
            &test_verify_keys(),
            Some(guest_access_list()),
            TokenValidatorOptions {
                validate_bearer_header: true,
                ..Default::default()
            },
        )
        .expect("validator configures");
    let user = validator.authorize(&req).expect("bearer accepted");
    assert_eq!(user.token_name, "bearer");
}
