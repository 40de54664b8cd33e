mod common;

use auth_service::{AppState, Config};
use service_test_support::keys::{write_fixture, write_primary_pair, Fixture};
use token_core::TokenError;

fn config_for(dir: &std::path::Path, key: &str) -> Config {
    let key_path = dir.join(key).to_string_lossy().into_owned();
    Config::from_lookup(move |name| match name {
        "PRIVATE_KEY_PATH" => Some(key_path.clone()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .unwrap()
}

#[test]
fn test_build_loads_private_key_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_primary_pair(dir.path()).unwrap();

    let (state, gate) = AppState::build(&config_for(dir.path(), "rsa_keys/private.pem")).unwrap();
    let pair = state
        .issuer
        .issue_pair("1", &serde_json::Map::new())
        .unwrap();

    let identity = gate
        .authenticate::<i64>(Some(&format!("Bearer {}", pair.access_token)))
        .unwrap();
    assert_eq!(identity.principal, 1);
}

#[test]
fn test_build_fails_without_key() {
    let dir = tempfile::tempdir().unwrap();

    let err = AppState::build(&config_for(dir.path(), "missing.pem"))
        .err()
        .expect("startup must fail");
    assert!(matches!(err, TokenError::KeyNotFound { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_build_rejects_public_key_as_signing_key() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "public.pem", Fixture::PrimaryPublic).unwrap();

    let err = AppState::build(&config_for(dir.path(), "public.pem"))
        .err()
        .expect("startup must fail");
    assert!(matches!(err, TokenError::KeyParseError { .. }));
}
