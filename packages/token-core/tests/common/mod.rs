#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use service_test_support::keys::{fixture_pem, Fixture};
use token_core::{
    IssuerSettings, KeyCache, KeyMaterial, Rs256Issuer, Rs256Verifier, SigningKey,
    VerificationKey, VerifierSettings,
};

#[ctor::ctor]
fn init_logging() {
    service_test_support::logging::init();
}

pub const T0: u64 = 1_700_000_000;

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn issuer(fixture: Fixture) -> Rs256Issuer {
    let key = SigningKey::from_pem(fixture_pem(fixture)).expect("fixture private key");
    Rs256Issuer::new(Arc::new(KeyCache::from_key(key)), IssuerSettings::default())
}

pub fn verifier(fixture: Fixture) -> Rs256Verifier {
    let key = VerificationKey::from_pem(fixture_pem(fixture)).expect("fixture public key");
    Rs256Verifier::new(Arc::new(KeyCache::from_key(key)), VerifierSettings::default())
}
