//! RS256 token protocol shared by the auth and resource services.
//!
//! The auth service owns the private key and mints tokens with
//! [`Rs256Issuer`]. The resource service holds only the public key and
//! admits requests through an [`AuthGate`] backed by an [`Rs256Verifier`].

pub mod claims;
pub mod config;
pub mod error;
pub mod gate;
pub mod issuer;
pub mod keys;
pub mod verifier;

pub use claims::{Claims, TokenUse, RESERVED_CLAIMS};
pub use config::{ConfigError, TokenSettings};
pub use error::{Result, TokenError};
pub use gate::{bearer_token, AuthGate, Identity, Unauthenticated};
pub use issuer::{IssuerSettings, Rs256Issuer, TokenIssuer, TokenPair};
pub use keys::{KeyCache, KeyLocation, KeyMaterial, SigningKey, VerificationKey};
pub use verifier::{Rs256Verifier, TokenVerifier, VerifierSettings};
