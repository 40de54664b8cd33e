//! Claims carried inside issued tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names owned by the protocol. Extra claims may not use them.
pub const RESERVED_CLAIMS: &[&str] = &["sub", "exp", "iat", "iss", "nbf", "jti", "token_use"];

/// What a token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// Short-lived bearer credential for protected requests.
    Access,
    /// Long-lived credential, never accepted as a bearer token.
    Refresh,
}

/// The claims set of a token.
///
/// `sub` and `exp` are required on decode; everything else is optional so
/// that hand-crafted or third-party payloads can be inspected. Free-form
/// claims (`username`, `email`, roles) live in `extra` and are carried
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (string form of the principal id)
    pub sub: String,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Issued-at (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Not-before (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<TokenUse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// True when `now` (seconds since epoch) is at or past `exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Look up a free-form claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Look up a free-form claim that is expected to be a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }

    /// Tokens minted without `token_use` are treated as access tokens.
    pub fn is_refresh(&self) -> bool {
        self.token_use == Some(TokenUse::Refresh)
    }
}

/// Returns the first reserved name used as a free-form claim key.
pub fn find_reserved_claim(extra: &Map<String, Value>) -> Option<&'static str> {
    RESERVED_CLAIMS
        .iter()
        .copied()
        .find(|name| extra.contains_key(*name))
}

/// Whole seconds since the Unix epoch; sub-second precision is discarded.
///
/// Issuer and verifier both go through this function so that expiry
/// boundaries agree.
pub fn unix_seconds(now: SystemTime) -> i64 {
    match now.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}
