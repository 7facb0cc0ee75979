//! Configuration management
//!
//! One `Config` value is constructed at startup (env vars merged over
//! defaults, `.env` honored) and passed explicitly into each component's
//! constructor. Components never read the environment themselves.

use jobtrends_common::{JobtrendsError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Upstream API Constants
// ============================================================================

/// Default upstream search endpoint (JSearch on RapidAPI).
pub const DEFAULT_API_URL: &str = "https://jsearch.p.rapidapi.com/search";

/// Default per-request timeout in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Attempt cap for rate-limited requests before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;

/// Base of the exponential backoff schedule, in milliseconds.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Upper bound on a single backoff sleep, in seconds.
pub const DEFAULT_BACKOFF_CAP_SECS: u64 = 60;

/// Politeness delay between successful page fetches, in milliseconds.
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 1_000;

// ============================================================================
// Staging / Database Constants
// ============================================================================

/// Default AWS region for the staging bucket.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/jobtrends";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub staging: StagingConfig,
    pub database: DatabaseConfig,
}

/// Upstream job-search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_host: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_secs: u64,
    pub politeness_delay_ms: u64,
}

/// S3 staging bucket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Endpoint override for S3-compatible stores (e.g. MinIO)
    pub endpoint: Option<String>,
    /// Use path-style addressing (required by MinIO)
    pub path_style: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            upstream: UpstreamConfig {
                api_url: std::env::var("RAPIDAPI_URL")
                    .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
                api_key: std::env::var("RAPIDAPI_KEY").unwrap_or_default(),
                api_host: std::env::var("RAPIDAPI_HOST").unwrap_or_default(),
                timeout_secs: env_parsed("API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT_SECS),
                max_attempts: env_parsed("API_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
                backoff_base_ms: env_parsed("API_BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS),
                backoff_cap_secs: env_parsed("API_BACKOFF_CAP_SECS", DEFAULT_BACKOFF_CAP_SECS),
                politeness_delay_ms: env_parsed(
                    "API_POLITENESS_DELAY_MS",
                    DEFAULT_POLITENESS_DELAY_MS,
                ),
            },
            staging: StagingConfig {
                bucket: std::env::var("S3_BUCKET_NAME").unwrap_or_default(),
                region: std::env::var("AWS_DEFAULT_REGION")
                    .unwrap_or_else(|_| DEFAULT_S3_REGION.to_string()),
                access_key: std::env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
                secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
                endpoint: std::env::var("S3_ENDPOINT").ok(),
                path_style: env_parsed("S3_PATH_STYLE", false),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parsed(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                connect_timeout_secs: env_parsed(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    ///
    /// Credentials for the upstream API are checked lazily by the fetcher so
    /// the load phase can run without them.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.max_attempts == 0 {
            return Err(JobtrendsError::Config(
                "API_MAX_ATTEMPTS must be greater than 0".to_string(),
            ));
        }

        if self.database.url.is_empty() {
            return Err(JobtrendsError::Config(
                "DATABASE_URL cannot be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(JobtrendsError::Config(
                "DATABASE_MAX_CONNECTIONS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            staging: StagingConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            api_host: String::new(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_cap_secs: DEFAULT_BACKOFF_CAP_SECS,
            politeness_delay_ms: DEFAULT_POLITENESS_DELAY_MS,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: DEFAULT_S3_REGION.to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            endpoint: None,
            path_style: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    /// Open a connection pool against the configured database
    pub async fn connect(&self) -> anyhow::Result<sqlx::PgPool> {
        use anyhow::Context;

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(self.connect_timeout_secs))
            .connect(&self.url)
            .await
            .context("Failed to connect to database")
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.upstream.api_url, DEFAULT_API_URL);
        assert_eq!(config.upstream.max_attempts, 6);
        assert_eq!(config.upstream.backoff_cap_secs, 60);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.upstream.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_database_url() {
        let mut config = Config::default();
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }
}
