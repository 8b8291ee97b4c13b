//! Key installation, algorithm families and asymmetric round trips

use authz::kms::{get_sign_keys, get_verify_keys, Key, KeyCapability, KeyManager, TokenConfig};
use authz::{AuthError, TokenError, TokenValidator, TokenValidatorOptions};
use authz_test_utils::{
    guest, guest_access_list, test_ed25519_key_manager, test_key_managers, test_sign_key,
    test_signing_key, test_verify_keys, TestRequestBuilder, TokenAssertions,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

fn verify_capable_key() -> Key {
    let mut key = Key::default();
    key.verify = KeyCapability {
        capable: true,
        token_name: "access_token".to_string(),
        max_lifetime: 900,
        ..Default::default()
    };
    key
}

fn configure(keys: &[Key]) -> Result<TokenValidator, AuthError> {
    let validator = TokenValidator::new();
    validator.configure(keys, Some(guest_access_list()), TokenValidatorOptions::default())?;
    Ok(validator)
}

fn authorize_token(validator: &TokenValidator, token: &str) -> Result<authz::User, AuthError> {
    let req = TestRequestBuilder::get("/").cookie("access_token", token).build();
    validator.authorize(&req)
}

// ============================================================================
// Key installation
// ============================================================================

#[test]
fn test_add_keys_accepts_verify_capable_key() {
    assert!(configure(&[verify_capable_key()]).is_ok());
}

#[test]
fn test_add_keys_rejects_unusable_keys() {
    let mut not_capable = verify_capable_key();
    not_capable.verify.capable = false;

    let mut no_name = verify_capable_key();
    no_name.verify.token_name.clear();

    let mut no_lifetime = verify_capable_key();
    no_lifetime.verify.max_lifetime = 0;

    for key in [not_capable, no_name, no_lifetime] {
        assert_eq!(
            configure(&[key]).map(|_| ()),
            Err(AuthError::NoVerifyKeys)
        );
    }
}

#[test]
fn test_add_keys_rejects_empty_list() {
    assert_eq!(configure(&[]).map(|_| ()), Err(AuthError::NoKeys));
}

#[test]
fn test_unusable_keys_are_dropped() {
    let mut not_capable = verify_capable_key();
    not_capable.verify.capable = false;
    let mut keys = test_verify_keys();
    keys.push(not_capable);

    let validator = configure(&keys).expect("one usable key is enough");
    let token = guest().signed_with(&test_sign_key()).token;
    assert!(authorize_token(&validator, &token).is_ok());
}

#[test]
fn test_key_manager_rejects_bad_config() {
    assert!(matches!(
        KeyManager::new(&TokenConfig::new("HS512", "secret").with_token_name("")),
        Err(AuthError::InvalidTokenConfig(_))
    ));
    assert!(matches!(
        KeyManager::new(&TokenConfig::new("HS512", "secret").with_lifetime(0)),
        Err(AuthError::InvalidTokenConfig(_))
    ));
    assert_eq!(
        KeyManager::new(&TokenConfig::new("XX999", "secret")).map(|_| ()),
        Err(AuthError::UnsupportedSignMethod("XX999".to_string()))
    );
}

// ============================================================================
// HMAC family
// ============================================================================

#[test]
fn test_hmac_key_verifies_whole_family() {
    let validator = configure(&test_verify_keys()).expect("configures");
    let key = test_sign_key();

    for method in ["HS256", "HS384", "HS512"] {
        let mut user = guest().build_user();
        key.sign_token(method, &mut user).expect("family method signs");
        user.token.assert_valid_jwt().assert_alg(method);
        assert!(authorize_token(&validator, &user.token).is_ok(), "{method}");
    }
}

#[test]
fn test_hmac_key_cannot_sign_other_family() {
    let mut user = guest().build_user();
    assert_eq!(
        test_sign_key().sign_token("RS256", &mut user),
        Err(AuthError::SigningNotSupported {
            key_id: "0".to_string(),
            method: "RS256".to_string(),
        })
    );
}

// ============================================================================
// EdDSA
// ============================================================================

#[test]
fn test_ed25519_round_trip() {
    let manager = test_ed25519_key_manager(1);
    let validator = configure(&get_verify_keys(std::slice::from_ref(&manager))).expect("configures");
    let sign_key = get_sign_keys(std::slice::from_ref(&manager))
        .into_iter()
        .next()
        .expect("ed25519 sign key");

    let user = guest().signed_with(&sign_key);
    user.token.assert_valid_jwt().assert_alg("EdDSA");

    let verified = authorize_token(&validator, &user.token).expect("ed25519 token accepted");
    assert_eq!(verified.claims, user.claims);
}

#[test]
fn test_ed25519_verify_only_from_public_pem() {
    let fixture = test_signing_key(2).expect("ed25519 fixture");
    let verify_only =
        KeyManager::new(&TokenConfig::from_pem("EdDSA", None, Some(&fixture.public_key_pem)))
            .expect("raw public key pem accepted");
    assert_eq!(verify_only.sign_keys().count(), 0);

    let validator = configure(&get_verify_keys(&[verify_only])).expect("configures");
    let signer = test_ed25519_key_manager(2);
    let sign_key = signer.sign_keys().next().expect("ed25519 sign key");

    let token = guest().signed_with(sign_key).token;
    assert!(authorize_token(&validator, &token).is_ok());

    // Another seed's signature does not verify.
    let stranger = test_ed25519_key_manager(3);
    let token = guest()
        .signed_with(stranger.sign_keys().next().expect("ed25519 sign key"))
        .token;
    assert_eq!(
        authorize_token(&validator, &token).map(|_| ()),
        Err(AuthError::InvalidToken(TokenError::SignatureInvalid))
    );
}

#[test]
fn test_mixed_key_sets() {
    let mut managers = test_key_managers("HS512", authz_test_utils::shared_secret());
    managers.push(test_ed25519_key_manager(4));
    let validator = configure(&get_verify_keys(&managers)).expect("configures");

    for key in get_sign_keys(&managers) {
        let token = guest().signed_with(&key).token;
        assert!(authorize_token(&validator, &token).is_ok(), "{:?}", key.algorithm);
    }
}

#[test]
fn test_algorithm_without_key() {
    let validator =
        configure(&get_verify_keys(&[test_ed25519_key_manager(5)])).expect("configures");
    let token = guest().signed_with(&test_sign_key()).token;

    assert_eq!(
        authorize_token(&validator, &token).map(|_| ()),
        Err(AuthError::InvalidToken(TokenError::NoCompatibleKey(
            "HS512".to_string()
        )))
    );
}

#[test]
fn test_unsigned_token_rejected() {
    let validator = configure(&test_verify_keys()).expect("configures");
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"smithj@outlook.com"}"#);
    let token = format!("{header}.{payload}.");

    assert_eq!(
        authorize_token(&validator, &token).map(|_| ()),
        Err(AuthError::InvalidToken(TokenError::NoCompatibleKey(
            "none".to_string()
        )))
    );
}

// ============================================================================
// Time claims
// ============================================================================

#[test]
fn test_issued_in_future_beyond_skew() {
    let validator = configure(&test_verify_keys()).expect("configures");
    let token = guest().issued_in(3600).signed_with(&test_sign_key()).token;

    assert_eq!(
        authorize_token(&validator, &token).map(|_| ()),
        Err(AuthError::InvalidToken(TokenError::IssuedInFuture))
    );
}

#[test]
fn test_not_yet_valid() {
    let validator = configure(&test_verify_keys()).expect("configures");
    let token = guest().not_before_in(3600).signed_with(&test_sign_key()).token;

    assert_eq!(
        authorize_token(&validator, &token).map(|_| ()),
        Err(AuthError::InvalidToken(TokenError::NotYetValid))
    );
}

#[test]
fn test_missing_expiry() {
    let validator = configure(&test_verify_keys()).expect("configures");
    let token = guest().without_claim("exp").signed_with(&test_sign_key()).token;

    assert!(matches!(
        authorize_token(&validator, &token),
        Err(AuthError::InvalidToken(TokenError::InvalidClaims(_)))
    ));
}
