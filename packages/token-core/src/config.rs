//! Token settings loaded from environment variables.
//!
//! Both services read the same variables; the auth service uses the
//! issuer half and the resource service the verifier half.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::issuer::{IssuerSettings, DEFAULT_ISSUER};
use crate::keys::{KeyCache, KeyLocation, SigningKey, VerificationKey};
use crate::verifier::{VerifierSettings, DEFAULT_LEEWAY_SECS, EXPECTED_ALGORITHM};

pub const DEFAULT_PRIVATE_KEY_PATH: &str = "rsa_keys/private.pem";
pub const DEFAULT_PUBLIC_KEY_PATH: &str = "rsa_keys/public.pem";

const DEFAULT_ACCESS_MINUTES: u64 = 30;
const DEFAULT_REFRESH_DAYS: u64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: String },

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(name: &str, value: &str, reason: impl Display) -> Self {
        Self::Invalid {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Non-empty value of `name`, trimmed.
pub fn var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Required variable; absent or blank is an error.
pub fn must_var<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(lookup, name).ok_or_else(|| ConfigError::Missing {
        name: name.to_string(),
    })
}

/// Parse `name` into `T`, falling back to `default` when unset.
pub fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match var(lookup, name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(name, &raw, e)),
        None => Ok(default),
    }
}

/// Boolean flag; accepts `true/false`, `1/0`, `yes/no`.
pub fn flag_var<F>(lookup: &F, name: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(lookup, name) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::invalid(name, &raw, "expected true or false")),
        },
        None => Ok(default),
    }
}

/// Positive count of `unit_secs`-long units as a duration.
fn ttl_var<F>(
    lookup: &F,
    name: &str,
    default: u64,
    unit_secs: u64,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let count: u64 = parse_var(lookup, name, default)?;
    if count == 0 {
        return Err(ConfigError::invalid(name, "0", "must be positive"));
    }
    count
        .checked_mul(unit_secs)
        .filter(|secs| i64::try_from(*secs).is_ok())
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::invalid(name, &count.to_string(), "too large"))
}

/// Everything the token protocol needs from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub key_search_roots: Vec<PathBuf>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: Option<String>,
    pub expected_issuer: Option<String>,
    pub leeway_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            private_key_path: PathBuf::from(DEFAULT_PRIVATE_KEY_PATH),
            public_key_path: PathBuf::from(DEFAULT_PUBLIC_KEY_PATH),
            key_search_roots: Vec::new(),
            access_ttl: Duration::from_secs(DEFAULT_ACCESS_MINUTES * 60),
            refresh_ttl: Duration::from_secs(DEFAULT_REFRESH_DAYS * 24 * 60 * 60),
            issuer: Some(DEFAULT_ISSUER.to_string()),
            expected_issuer: Some(DEFAULT_ISSUER.to_string()),
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }
}

impl TokenSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(alg) = var(&lookup, "JWT_ALGORITHM") {
            if alg != EXPECTED_ALGORITHM {
                return Err(ConfigError::invalid(
                    "JWT_ALGORITHM",
                    &alg,
                    format!("only {EXPECTED_ALGORITHM} is supported"),
                ));
            }
        }

        let access_ttl = ttl_var(
            &lookup,
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            DEFAULT_ACCESS_MINUTES,
            60,
        )?;
        let refresh_ttl = ttl_var(
            &lookup,
            "REFRESH_TOKEN_EXPIRE_DAYS",
            DEFAULT_REFRESH_DAYS,
            24 * 60 * 60,
        )?;

        // Compared against signed Unix seconds by the verifier
        let leeway_secs: u64 = parse_var(&lookup, "TOKEN_LEEWAY_SECS", DEFAULT_LEEWAY_SECS)?;
        if i64::try_from(leeway_secs).is_err() {
            return Err(ConfigError::invalid(
                "TOKEN_LEEWAY_SECS",
                &leeway_secs.to_string(),
                "too large",
            ));
        }

        let key_search_roots = var(&lookup, "KEY_SEARCH_ROOTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|root| !root.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        // Set-but-empty EXPECTED_ISSUER disables the issuer check.
        let expected_issuer = match lookup("EXPECTED_ISSUER") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(raw.trim().to_string()),
            None => Some(DEFAULT_ISSUER.to_string()),
        };

        Ok(Self {
            private_key_path: var(&lookup, "PRIVATE_KEY_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PRIVATE_KEY_PATH), PathBuf::from),
            public_key_path: var(&lookup, "PUBLIC_KEY_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PUBLIC_KEY_PATH), PathBuf::from),
            key_search_roots,
            access_ttl,
            refresh_ttl,
            issuer: Some(
                var(&lookup, "TOKEN_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            ),
            expected_issuer,
            leeway_secs,
        })
    }

    pub fn issuer_settings(&self) -> IssuerSettings {
        IssuerSettings {
            issuer: self.issuer.clone(),
            access_ttl: self.access_ttl,
            refresh_ttl: self.refresh_ttl,
        }
    }

    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            expected_issuer: self.expected_issuer.clone(),
            leeway_secs: self.leeway_secs,
        }
    }

    /// Unloaded cache for the private key.
    pub fn signing_key_cache(&self) -> Arc<KeyCache<SigningKey>> {
        Arc::new(KeyCache::new(
            KeyLocation::new(&self.private_key_path)
                .with_search_roots(self.key_search_roots.iter().cloned()),
        ))
    }

    /// Unloaded cache for the public key.
    pub fn verification_key_cache(&self) -> Arc<KeyCache<VerificationKey>> {
        Arc::new(KeyCache::new(
            KeyLocation::new(&self.public_key_path)
                .with_search_roots(self.key_search_roots.iter().cloned()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = TokenSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, TokenSettings::default());
        assert_eq!(settings.access_ttl, Duration::from_secs(1800));
        assert_eq!(settings.refresh_ttl, Duration::from_secs(604_800));
        assert_eq!(settings.expected_issuer.as_deref(), Some("auth_service"));
    }

    #[test]
    fn test_overrides() {
        let settings = TokenSettings::from_lookup(lookup(&[
            ("PRIVATE_KEY_PATH", "/keys/priv.pem"),
            ("KEY_SEARCH_ROOTS", " /srv , ,/opt "),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "1"),
            ("TOKEN_ISSUER", "issuer-a"),
            ("EXPECTED_ISSUER", ""),
            ("TOKEN_LEEWAY_SECS", "0"),
            ("JWT_ALGORITHM", "RS256"),
        ]))
        .unwrap();

        assert_eq!(settings.private_key_path, PathBuf::from("/keys/priv.pem"));
        assert_eq!(
            settings.key_search_roots,
            vec![PathBuf::from("/srv"), PathBuf::from("/opt")]
        );
        assert_eq!(settings.access_ttl, Duration::from_secs(300));
        assert_eq!(settings.refresh_ttl, Duration::from_secs(86_400));
        assert_eq!(settings.issuer_settings().issuer.as_deref(), Some("issuer-a"));
        assert_eq!(settings.verifier_settings().expected_issuer, None);
        assert_eq!(settings.verifier_settings().leeway_secs, 0);
    }

    #[test]
    fn test_rejects_other_algorithms() {
        let err = TokenSettings::from_lookup(lookup(&[("JWT_ALGORITHM", "HS256")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "JWT_ALGORITHM"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = TokenSettings::from_lookup(lookup(&[("ACCESS_TOKEN_EXPIRE_MINUTES", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_EXPIRE_MINUTES"));

        let err = TokenSettings::from_lookup(lookup(&[("REFRESH_TOKEN_EXPIRE_DAYS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_rejects_ttl_overflow() {
        let err = TokenSettings::from_lookup(lookup(&[(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            "400000000000000000",
        )]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref name, ref reason, .. }
                if name == "ACCESS_TOKEN_EXPIRE_MINUTES" && reason == "too large")
        );

        let err = TokenSettings::from_lookup(lookup(&[(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            &u64::MAX.to_string(),
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("REFRESH_TOKEN_EXPIRE_DAYS"));
    }

    #[test]
    fn test_rejects_leeway_beyond_i64() {
        let err = TokenSettings::from_lookup(lookup(&[(
            "TOKEN_LEEWAY_SECS",
            &u64::MAX.to_string(),
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "TOKEN_LEEWAY_SECS"));

        let max = i64::MAX.to_string();
        let settings =
            TokenSettings::from_lookup(lookup(&[("TOKEN_LEEWAY_SECS", &max)])).unwrap();
        assert_eq!(settings.leeway_secs, i64::MAX as u64);
    }

    #[test]
    fn test_flag_var() {
        let source = lookup(&[("A", "TRUE"), ("B", "0"), ("C", "maybe")]);
        assert_eq!(flag_var(&source, "A", false), Ok(true));
        assert_eq!(flag_var(&source, "B", true), Ok(false));
        assert_eq!(flag_var(&source, "D", true), Ok(true));
        assert!(flag_var(&source, "C", false).is_err());
        assert_eq!(
            must_var(&source, "D"),
            Err(ConfigError::Missing {
                name: "D".to_string()
            })
        );
    }
}
