//! Resource service configuration loaded from environment variables.

use std::env;

use token_core::config::{parse_var, var};
use token_core::{ConfigError, TokenSettings};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub tokens: TokenSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host: var(&lookup, "RESOURCE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "RESOURCE_PORT", 8001)?,
            tokens: TokenSettings::from_lookup(&lookup)?,
        })
    }
}
