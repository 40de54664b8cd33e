#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use auth_service::{AppState, Config};
use service_test_support::keys::{fixture_pem, Fixture};
use token_core::{AuthGate, KeyCache, KeyMaterial, SigningKey, VerificationKey};

#[ctor::ctor]
fn init_logging() {
    service_test_support::logging::init();
}

/// Settings for tests: defaults with the cheapest bcrypt cost.
pub fn test_config() -> Config {
    Config::from_lookup(|name| (name == "BCRYPT_COST").then(|| "4".to_string()))
        .expect("test config")
}

/// State built from the primary fixture key and test settings.
pub fn build_state() -> (web::Data<AppState>, web::Data<AuthGate>) {
    let config = test_config();
    let key = SigningKey::from_pem(fixture_pem(Fixture::PrimaryPrivate)).expect("fixture key");
    let (state, gate) =
        AppState::with_signing_key(&config, Arc::new(KeyCache::from_key(key))).expect("state");
    (web::Data::new(state), web::Data::new(gate))
}

pub fn primary_public_key() -> Arc<KeyCache<VerificationKey>> {
    let key = VerificationKey::from_pem(fixture_pem(Fixture::PrimaryPublic)).expect("fixture key");
    Arc::new(KeyCache::from_key(key))
}

#[macro_export]
macro_rules! auth_app {
    ($state:expr, $gate:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(service_support::middleware::StructuredLogger)
                .wrap(service_support::middleware::TraceSpan)
                .wrap(service_support::middleware::RequestTrace)
                .app_data($state.clone())
                .app_data($gate.clone())
                .configure(auth_service::routes::configure),
        )
        .await
    };
}
