//! Centralized configuration (environment variables + defaults).

use crate::domain::links::Links;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://api.convenios.gov.br/siconv/";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
/// Local hour at which the nightly data refresh finishes.
pub const DEFAULT_CACHE_REFRESH_HOUR: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub public_base_url: String,
    pub db_max_connections: u32,
    pub cache_refresh_hour: u32,
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl Settings {
    /// Reads the process environment, after loading `.env` when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw.parse().map_err(|e| invalid("BIND_ADDR", &raw, e))?;

        let public_base_url = lookup("PUBLIC_BASE_URL").unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
        Links::new(&public_base_url).map_err(|e| invalid("PUBLIC_BASE_URL", &public_base_url, e))?;

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|e| invalid("DB_MAX_CONNECTIONS", &raw, e))?
                .max(1),
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let cache_refresh_hour = match lookup("CACHE_REFRESH_HOUR") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(h) if h < 24 => h,
                Ok(_) => return Err(invalid("CACHE_REFRESH_HOUR", &raw, "must be between 0 and 23")),
                Err(e) => return Err(invalid("CACHE_REFRESH_HOUR", &raw, e)),
            },
            None => DEFAULT_CACHE_REFRESH_HOUR,
        };

        Ok(Self {
            database_url,
            bind_addr,
            public_base_url,
            db_max_connections,
            cache_refresh_hour,
        })
    }

    pub fn links(&self) -> Result<Links, ConfigError> {
        Links::new(&self.public_base_url).map_err(|e| invalid("PUBLIC_BASE_URL", &self.public_base_url, e))
    }
}
