use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};

use crate::domain::allocator::AllocationPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub allocation_policy: AllocationPolicy,
    /// Base URL of the geocoding service; the stub geocoder is used when unset.
    pub geocoding_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Upper bound for row-lock waits inside a transaction.
    pub lock_timeout_ms: u64,
}

/// Loads the configuration from the process environment.
pub fn load() -> Result<Config> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the configuration from an arbitrary key lookup.
pub fn from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

    Ok(Config {
        server: ServerConfig {
            host: lookup("SERVER_HOST").unwrap_or("0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 3000)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 15)?),
        },
        database: DatabaseConfig {
            url,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            lock_timeout_ms: parse_or(&lookup, "DB_LOCK_TIMEOUT_MS", 3000)?,
        },
        allocation_policy: parse_or(&lookup, "ALLOCATION_POLICY", AllocationPolicy::Cheapest)?,
        geocoding_url: lookup("GEOCODING_URL").filter(|url| !url.trim().is_empty()),
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| anyhow!("Invalid value for {}: {}", key, err)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_database_url() {
        assert!(from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn applies_defaults() {
        let config = from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/db")])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.lock_timeout_ms, 3000);
        assert_eq!(config.allocation_policy, AllocationPolicy::Cheapest);
        assert!(config.geocoding_url.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("SERVER_PORT", "8081"),
            ("ALLOCATION_POLICY", "nearest"),
            ("GEOCODING_URL", "http://geo.local"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.allocation_policy, AllocationPolicy::Nearest);
        assert_eq!(config.geocoding_url.as_deref(), Some("http://geo.local"));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let result = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("SERVER_PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }
}
