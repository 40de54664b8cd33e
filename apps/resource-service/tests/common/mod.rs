#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use resource_service::{AppState, Config};
use serde_json::{json, Map, Value};
use service_test_support::keys::{fixture_pem, Fixture};
use token_core::{
    AuthGate, IssuerSettings, KeyCache, KeyMaterial, Rs256Issuer, SigningKey, VerificationKey,
};

#[ctor::ctor]
fn init_logging() {
    service_test_support::logging::init();
}

/// State verifying with the primary fixture public key.
pub fn build_state() -> (web::Data<AppState>, web::Data<AuthGate>) {
    let config = Config::from_lookup(|_| None).expect("default config");
    let key =
        VerificationKey::from_pem(fixture_pem(Fixture::PrimaryPublic)).expect("fixture key");
    let (state, gate) = AppState::with_verification_key(&config, Arc::new(KeyCache::from_key(key)));
    (web::Data::new(state), web::Data::new(gate))
}

pub fn issuer(fixture: Fixture) -> Rs256Issuer {
    let key = SigningKey::from_pem(fixture_pem(fixture)).expect("fixture key");
    Rs256Issuer::new(Arc::new(KeyCache::from_key(key)), IssuerSettings::default())
}

/// Claims the auth service puts on access tokens.
pub fn user_claims(username: &str, is_admin: bool) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("username".to_string(), json!(username));
    extra.insert("email".to_string(), json!(format!("{username}@example.com")));
    extra.insert("is_admin".to_string(), json!(is_admin));
    extra
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

#[macro_export]
macro_rules! resource_app {
    ($state:expr, $gate:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(service_support::middleware::StructuredLogger)
                .wrap(service_support::middleware::TraceSpan)
                .wrap(service_support::middleware::RequestTrace)
                .app_data($state.clone())
                .app_data($gate.clone())
                .configure(resource_service::routes::configure),
        )
        .await
    };
}
