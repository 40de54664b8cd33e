//! Auth service configuration loaded from environment variables.

use std::env;

use token_core::config::{flag_var, parse_var, var};
use token_core::{ConfigError, TokenSettings};

/// Account created at startup when no user with its name exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            email: "admin@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Sets `Secure` on the refresh-token cookie
    pub cookie_secure: bool,
    pub admin: AdminSeed,
    /// bcrypt work factor for stored passwords
    pub password_cost: u32,
    pub tokens: TokenSettings,
}

pub const DEFAULT_PASSWORD_COST: u32 = 12;
const PASSWORD_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AdminSeed::default();

        let password_cost = parse_var(&lookup, "BCRYPT_COST", DEFAULT_PASSWORD_COST)?;
        if !PASSWORD_COST_RANGE.contains(&password_cost) {
            return Err(ConfigError::invalid(
                "BCRYPT_COST",
                &password_cost.to_string(),
                "must be between 4 and 31",
            ));
        }

        Ok(Self {
            host: var(&lookup, "AUTH_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "AUTH_PORT", 8000)?,
            cookie_secure: flag_var(&lookup, "COOKIE_SECURE", false)?,
            admin: AdminSeed {
                username: var(&lookup, "ADMIN_USERNAME").unwrap_or(defaults.username),
                password: var(&lookup, "ADMIN_PASSWORD").unwrap_or(defaults.password),
                email: var(&lookup, "ADMIN_EMAIL").unwrap_or(defaults.email),
            },
            password_cost,
            tokens: TokenSettings::from_lookup(&lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 8000);
        assert!(!config.cookie_secure);
        assert_eq!(config.admin, AdminSeed::default());
        assert_eq!(config.password_cost, 12);
        assert_eq!(config.tokens, TokenSettings::default());
    }

    #[test]
    fn test_bad_port() {
        let err = Config::from_lookup(|name| (name == "AUTH_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "AUTH_PORT"));
    }

    #[test]
    fn test_password_cost_bounds() {
        let with = |value: &'static str| {
            Config::from_lookup(move |name| (name == "BCRYPT_COST").then(|| value.to_string()))
        };

        assert_eq!(with("4").unwrap().password_cost, 4);
        for bad in ["3", "32", "twelve"] {
            let err = with(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "BCRYPT_COST"));
        }
    }
}
