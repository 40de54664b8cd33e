//! Token issuance.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::{encode, Algorithm, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};
use uuid::Uuid;

use crate::claims::{find_reserved_claim, unix_seconds, Claims, TokenUse};
use crate::error::{Result, TokenError};
use crate::keys::{KeyCache, SigningKey};

/// Default access token lifetime (30 minutes).
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(30 * 60);
/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Issuer identifier used when none is configured.
pub const DEFAULT_ISSUER: &str = "auth_service";

/// Issuer-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSettings {
    /// Value of the `iss` claim; `None` omits the claim.
    pub issuer: Option<String>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for IssuerSettings {
    fn default() -> Self {
        Self {
            issuer: Some(DEFAULT_ISSUER.to_string()),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        }
    }
}

/// Access and refresh token handed out at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Capability to mint signed tokens.
pub trait TokenIssuer: Send + Sync {
    /// Mint a token for `subject` valid for `ttl` starting at `now`.
    ///
    /// # Errors
    ///
    /// `InvalidClaims` for an empty subject, a TTL under one second or an
    /// extra claim that uses a reserved name; `SigningError` when the key is
    /// unavailable or signing fails.
    fn issue_at(
        &self,
        subject: &str,
        extra: &Map<String, Value>,
        ttl: Duration,
        token_use: TokenUse,
        now: SystemTime,
    ) -> Result<String>;

    /// Mint an access token valid for `ttl` from now.
    fn issue(&self, subject: &str, extra: &Map<String, Value>, ttl: Duration) -> Result<String> {
        self.issue_at(subject, extra, ttl, TokenUse::Access, SystemTime::now())
    }
}

/// RS256 issuer backed by a cached private key.
#[derive(Debug, Clone)]
pub struct Rs256Issuer {
    key: Arc<KeyCache<SigningKey>>,
    settings: IssuerSettings,
}

impl Rs256Issuer {
    pub fn new(key: Arc<KeyCache<SigningKey>>, settings: IssuerSettings) -> Self {
        Self { key, settings }
    }

    pub fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// Access token with the configured access TTL.
    pub fn issue_access(&self, subject: &str, extra: &Map<String, Value>) -> Result<String> {
        self.issue(subject, extra, self.settings.access_ttl)
    }

    /// Refresh token with the configured refresh TTL.
    pub fn issue_refresh(&self, subject: &str, extra: &Map<String, Value>) -> Result<String> {
        self.issue_at(
            subject,
            extra,
            self.settings.refresh_ttl,
            TokenUse::Refresh,
            SystemTime::now(),
        )
    }

    pub fn issue_pair(&self, subject: &str, extra: &Map<String, Value>) -> Result<TokenPair> {
        self.issue_pair_at(subject, extra, SystemTime::now())
    }

    /// Access + refresh token minted at the same instant.
    pub fn issue_pair_at(
        &self,
        subject: &str,
        extra: &Map<String, Value>,
        now: SystemTime,
    ) -> Result<TokenPair> {
        let access_token = self.issue_at(
            subject,
            extra,
            self.settings.access_ttl,
            TokenUse::Access,
            now,
        )?;
        let refresh_token = self.issue_at(
            subject,
            extra,
            self.settings.refresh_ttl,
            TokenUse::Refresh,
            now,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.settings.access_ttl.as_secs(),
        })
    }

    fn build_claims(
        &self,
        subject: &str,
        extra: &Map<String, Value>,
        ttl: Duration,
        token_use: TokenUse,
        now: SystemTime,
    ) -> Result<Claims> {
        if subject.trim().is_empty() {
            return Err(TokenError::InvalidClaims(
                "subject must not be empty".to_string(),
            ));
        }
        if let Some(name) = find_reserved_claim(extra) {
            return Err(TokenError::InvalidClaims(format!(
                "'{name}' is a reserved claim"
            )));
        }

        let ttl_secs = i64::try_from(ttl.as_secs())
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                TokenError::InvalidClaims("ttl must be between one second and i64::MAX".to_string())
            })?;

        let iat = unix_seconds(now);
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| TokenError::InvalidClaims("expiry overflows".to_string()))?;

        Ok(Claims {
            sub: subject.to_string(),
            exp,
            iat: Some(iat),
            nbf: None,
            iss: self.settings.issuer.clone(),
            jti: Some(Uuid::new_v4().to_string()),
            token_use: Some(token_use),
            extra: extra.clone(),
        })
    }
}

impl TokenIssuer for Rs256Issuer {
    fn issue_at(
        &self,
        subject: &str,
        extra: &Map<String, Value>,
        ttl: Duration,
        token_use: TokenUse,
        now: SystemTime,
    ) -> Result<String> {
        let claims = self.build_claims(subject, extra, ttl, token_use, now)?;

        let key = self.key.get().map_err(|e| {
            error!(error = %e, code = e.code(), "signing key unavailable");
            TokenError::SigningError("signing key unavailable".to_string())
        })?;

        let token = encode(&Header::new(Algorithm::RS256), &claims, key.encoding_key())
            .map_err(|e| {
                error!(error = %e, "token signing failed");
                TokenError::SigningError(e.to_string())
            })?;

        debug!(sub = %claims.sub, exp = claims.exp, ?token_use, "token issued");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::json;
    use service_test_support::keys::{fixture_pem, Fixture};

    use super::*;
    use crate::keys::{KeyLocation, KeyMaterial};

    fn issuer() -> Rs256Issuer {
        let key = SigningKey::from_pem(fixture_pem(Fixture::PrimaryPrivate)).unwrap();
        Rs256Issuer::new(Arc::new(KeyCache::from_key(key)), IssuerSettings::default())
    }

    fn payload(token: &str) -> serde_json::Value {
        let segment = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_issue_sets_timing_and_issuer_claims() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_900);
        let mut extra = Map::new();
        extra.insert("username".to_string(), json!("alice"));

        let token = issuer()
            .issue_at("1", &extra, Duration::from_secs(30), TokenUse::Access, now)
            .unwrap();
        let body = payload(&token);

        assert_eq!(body["sub"], "1");
        assert_eq!(body["iat"], 1_700_000_000);
        assert_eq!(body["exp"], 1_700_000_030);
        assert_eq!(body["iss"], "auth_service");
        assert_eq!(body["token_use"], "access");
        assert_eq!(body["username"], "alice");
        assert!(body["jti"].is_string());
    }

    #[test]
    fn test_header_is_rs256() {
        let token = issuer().issue("7", &Map::new(), DEFAULT_ACCESS_TTL).unwrap();
        let segment = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap();
        assert_eq!(header["alg"], "RS256");
    }

    #[test]
    fn test_tokens_differ_between_issuances() {
        let issuer = issuer();
        let a = issuer.issue("1", &Map::new(), DEFAULT_ACCESS_TTL).unwrap();
        let b = issuer.issue("1", &Map::new(), DEFAULT_ACCESS_TTL).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_empty_subject() {
        let result = issuer().issue("  ", &Map::new(), DEFAULT_ACCESS_TTL);
        assert!(matches!(result, Err(TokenError::InvalidClaims(_))));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let result = issuer().issue("1", &Map::new(), Duration::from_millis(500));
        assert!(matches!(result, Err(TokenError::InvalidClaims(_))));
    }

    #[test]
    fn test_rejects_reserved_extra_claims() {
        for name in ["sub", "exp", "iat", "iss"] {
            let mut extra = Map::new();
            extra.insert(name.to_string(), json!("x"));
            let result = issuer().issue("1", &extra, DEFAULT_ACCESS_TTL);
            assert!(
                matches!(result, Err(TokenError::InvalidClaims(ref msg)) if msg.contains(name)),
                "{name}: {result:?}"
            );
        }
    }

    #[test]
    fn test_missing_key_is_signing_error() {
        let missing = KeyLocation::new("/nonexistent/dir/private.pem");
        let issuer = Rs256Issuer::new(Arc::new(KeyCache::new(missing)), IssuerSettings::default());

        let result = issuer.issue("1", &Map::new(), DEFAULT_ACCESS_TTL);
        assert_eq!(
            result,
            Err(TokenError::SigningError(
                "signing key unavailable".to_string()
            ))
        );
    }

    #[test]
    fn test_issue_pair() {
        let now = UNIX_EPOCH + Duration::from_secs(1_000_000);
        let pair = issuer().issue_pair_at("9", &Map::new(), now).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 30 * 60);
        assert_eq!(payload(&pair.access_token)["token_use"], "access");
        assert_eq!(payload(&pair.refresh_token)["token_use"], "refresh");
        assert_eq!(
            payload(&pair.refresh_token)["exp"],
            1_000_000 + 7 * 24 * 60 * 60
        );
    }
}
