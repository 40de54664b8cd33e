use std::sync::Arc;

use token_core::{AuthGate, KeyCache, Rs256Verifier, TokenError, VerificationKey};
use tracing::info;

use crate::config::Config;
use crate::products::ProductStore;

/// Shared state for the resource service handlers.
pub struct AppState {
    pub products: ProductStore,
}

impl AppState {
    /// Load the public key and build the gate.
    ///
    /// Fails when the key cannot be loaded; the service must not start
    /// without it.
    pub fn build(config: &Config) -> Result<(Self, AuthGate), TokenError> {
        let key = config.tokens.verification_key_cache();
        key.warm()?;
        Ok(Self::with_verification_key(config, key))
    }

    pub fn with_verification_key(
        config: &Config,
        key: Arc<KeyCache<VerificationKey>>,
    ) -> (Self, AuthGate) {
        let settings = config.tokens.verifier_settings();
        info!(
            expected_issuer = ?settings.expected_issuer,
            leeway_secs = settings.leeway_secs,
            "token verifier ready"
        );

        let gate = AuthGate::new(Arc::new(Rs256Verifier::new(key, settings)));
        let state = Self {
            products: ProductStore::seeded(),
        };
        (state, gate)
    }
}
