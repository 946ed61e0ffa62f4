//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Compiler and metadata store configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// MySQL connection URL for the metadata store. Only required when no
    /// static metadata file is used.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Deadline for a single metadata lookup (default: 5000 ms).
    pub metadata_timeout: Duration,

    /// TTL of the cross-request metadata cache. Zero disables it (default: 0).
    pub metadata_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            metadata_timeout: Duration::from_millis(5000),
            metadata_cache_ttl: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let timeout_ms: u64 = env::var("METADATA_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("METADATA_TIMEOUT_MS must be a valid u64")?;

        let cache_ttl_secs: u64 = env::var("METADATA_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .context("METADATA_CACHE_TTL_SECS must be a valid u64")?;

        Ok(Self {
            database_url,
            database_max_connections,
            metadata_timeout: Duration::from_millis(timeout_ms),
            metadata_cache_ttl: Duration::from_secs(cache_ttl_secs),
        })
    }

    /// The database URL, or an error explaining how to provide one.
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL environment variable is required without --metadata")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_cross_request_cache() {
        let config = Config::default();
        assert_eq!(config.metadata_cache_ttl, Duration::ZERO);
        assert_eq!(config.metadata_timeout, Duration::from_millis(5000));
        assert!(config.require_database_url().is_err());
    }
}
