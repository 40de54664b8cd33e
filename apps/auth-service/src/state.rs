use std::sync::Arc;
use std::time::Duration;

use token_core::{
    AuthGate, KeyCache, Rs256Issuer, Rs256Verifier, SigningKey, TokenError,
};
use tracing::info;

use crate::config::Config;
use crate::users::{BcryptHasher, UserStore};

/// Shared state for the auth service handlers.
pub struct AppState {
    pub issuer: Rs256Issuer,
    pub users: UserStore,
    pub cookie_secure: bool,
    pub refresh_ttl: Duration,
}

impl AppState {
    /// Load the signing key and wire issuer, gate and user store.
    ///
    /// The gate verifies with the public half of the signing key, so the
    /// auth service needs no separate public key file. Fails when the key
    /// cannot be loaded.
    pub fn build(config: &Config) -> Result<(Self, AuthGate), TokenError> {
        let signing = config.tokens.signing_key_cache();
        signing.warm()?;
        Self::with_signing_key(config, signing)
    }

    pub fn with_signing_key(
        config: &Config,
        signing: Arc<KeyCache<SigningKey>>,
    ) -> Result<(Self, AuthGate), TokenError> {
        let verification = Arc::new(KeyCache::from_key(signing.get()?.verification_key()));
        let verifier = Rs256Verifier::new(verification, config.tokens.verifier_settings());
        let gate = AuthGate::new(Arc::new(verifier));

        let issuer = Rs256Issuer::new(signing, config.tokens.issuer_settings());
        info!(
            issuer = ?issuer.settings().issuer,
            access_ttl_secs = issuer.settings().access_ttl.as_secs(),
            "token issuer ready"
        );

        let state = Self {
            issuer,
            users: UserStore::seeded(
                &config.admin,
                BcryptHasher::new(config.password_cost),
            ),
            cookie_secure: config.cookie_secure,
            refresh_ttl: config.tokens.refresh_ttl,
        };
        Ok((state, gate))
    }
}
