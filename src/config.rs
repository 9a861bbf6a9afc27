//! Runtime configuration, read from the environment (and `.env` via dotenvy in `main`).

use anyhow::{Context, Result};
use std::str::FromStr;
use crate::domain::value_objects::Currency;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub currency: Currency,
    pub session_ttl_hours: i64,
    pub admin_email: String,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let currency = match lookup("STORE_CURRENCY") {
            Some(code) => Currency::new(&code).context("STORE_CURRENCY")?,
            None => Currency::default(),
        };
        Ok(Self {
            database_url,
            port: parse_or(&lookup, "PORT", 3000)?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            currency,
            session_ttl_hours: parse_or(&lookup, "SESSION_TTL_HOURS", 7 * 24)?,
            admin_email: lookup("ADMIN_EMAIL").unwrap_or_else(|| "admin@modanova.local".to_string()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
