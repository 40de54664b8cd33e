//! Token verification.
//!
//! Verification runs as a fixed sequence of checks; the first failure is
//! returned:
//!
//! 1. structure: three base64url segments (header and payload non-empty),
//!    JSON header with an `alg`
//! 2. signature: `alg` must be RS256, signature must match the public key
//! 3. claims shape: `sub` and `exp` present and well typed
//! 4. time: `exp`, `nbf`, `iat`
//! 5. issuer
//!
//! Payload content is never trusted before step 2 succeeds.

use std::sync::Arc;
use std::time::SystemTime;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Header, Validation};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::claims::{unix_seconds, Claims};
use crate::error::{Result, TokenError};
use crate::issuer::DEFAULT_ISSUER;
use crate::keys::{KeyCache, VerificationKey};

/// The only algorithm a verifier accepts.
pub const EXPECTED_ALGORITHM: &str = "RS256";

/// Default clock-skew tolerance for `iat`/`nbf`, in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Verifier-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    /// When set, a present `iss` claim must equal this value.
    pub expected_issuer: Option<String>,
    /// Tolerance for tokens issued slightly in the future. Never applied to `exp`.
    pub leeway_secs: u64,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            expected_issuer: Some(DEFAULT_ISSUER.to_string()),
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }
}

/// Capability to check tokens.
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` as of `now` and return its claims.
    ///
    /// # Errors
    ///
    /// One of `MalformedToken`, `InvalidSignature`, `InvalidClaims`,
    /// `TokenExpired`, `TokenNotYetValid`, `IssuerMismatch`; or a key error
    /// when the public key cannot be loaded.
    fn verify_at(&self, token: &str, now: SystemTime) -> Result<Claims>;

    fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, SystemTime::now())
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// RS256 verifier backed by a cached public key.
#[derive(Debug, Clone)]
pub struct Rs256Verifier {
    key: Arc<KeyCache<VerificationKey>>,
    settings: VerifierSettings,
    validation: Validation,
}

impl Rs256Verifier {
    pub fn new(key: Arc<KeyCache<VerificationKey>>, settings: VerifierSettings) -> Self {
        // Signature and algorithm pinning only; time and issuer checks run
        // afterwards so each failure maps onto its own error.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            key,
            settings,
            validation,
        }
    }

    pub fn settings(&self) -> &VerifierSettings {
        &self.settings
    }

    fn check_time(&self, claims: &Claims, now: i64) -> Result<()> {
        if claims.is_expired_at(now) {
            return Err(TokenError::TokenExpired);
        }

        let leeway = i64::try_from(self.settings.leeway_secs).unwrap_or(i64::MAX);
        let horizon = now.saturating_add(leeway);
        let from_future = |instant: Option<i64>| instant.is_some_and(|at| at > horizon);
        if from_future(claims.nbf) || from_future(claims.iat) {
            return Err(TokenError::TokenNotYetValid);
        }

        Ok(())
    }

    fn check_issuer(&self, claims: &Claims) -> Result<()> {
        match (&self.settings.expected_issuer, &claims.iss) {
            (Some(expected), Some(found)) if expected != found => {
                Err(TokenError::IssuerMismatch {
                    expected: expected.clone(),
                    found: found.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl TokenVerifier for Rs256Verifier {
    fn verify_at(&self, token: &str, now: SystemTime) -> Result<Claims> {
        let header = decode_structure(token)?;

        if header.alg != EXPECTED_ALGORITHM {
            warn!(alg = %header.alg, "token rejected: unexpected algorithm");
            return Err(TokenError::InvalidSignature);
        }

        let key = self.key.get()?;

        let claims = decode::<Claims>(token, key.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::Json(err) => TokenError::InvalidClaims(err.to_string()),
                ErrorKind::Utf8(_) => TokenError::InvalidClaims("payload is not UTF-8".to_string()),
                _ => {
                    debug!(error = %e, "signature check failed");
                    TokenError::InvalidSignature
                }
            })?;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::InvalidClaims("sub must not be empty".to_string()));
        }

        self.check_time(&claims, unix_seconds(now))?;
        self.check_issuer(&claims)?;

        Ok(claims)
    }
}

/// Structural pass over the compact serialization.
///
/// Every segment must be valid base64url and the header must parse both as
/// a bare `{ "alg": ... }` object and as a full JOSE header. The header is
/// returned so the algorithm can be pinned before any key is used.
fn decode_structure(token: &str) -> Result<RawHeader> {
    let malformed = |reason: &str| TokenError::MalformedToken(reason.to_string());

    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(malformed("expected three dot-separated segments"));
    };

    // An empty signature is left for the signature step to reject.
    if header.is_empty() || payload.is_empty() {
        return Err(malformed("empty header or payload"));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| malformed("header is not base64url"))?;
    URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| malformed("payload is not base64url"))?;
    URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| malformed("signature is not base64url"))?;

    let raw: RawHeader = serde_json::from_slice(&header_bytes)
        .map_err(|_| malformed("header is not a JSON object with an alg"))?;

    if raw.alg == EXPECTED_ALGORITHM {
        serde_json::from_slice::<Header>(&header_bytes)
            .map_err(|_| malformed("header has invalid fields"))?;
    }

    Ok(raw)
}
