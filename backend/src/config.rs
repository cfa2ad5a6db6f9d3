//! Configuration management for the parts stock ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with PARTSTOCK__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::numbering::DEFAULT_OUTGOING_PREFIX;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Ledger behaviour
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// How long to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Upper bound on waiting for a row or advisory lock
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Leading segment of outgoing numbers, `OUT` in `OUT-161026-001`
    pub outgoing_prefix: String,

    /// Buffer size of the live request-item channel
    pub notification_capacity: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("PARTSTOCK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.lock_timeout_ms", 5000)?
            .set_default("ledger.outgoing_prefix", DEFAULT_OUTGOING_PREFIX)?
            .set_default("ledger.notification_capacity", 256)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PARTSTOCK__ prefix)
            .add_source(
                Environment::with_prefix("PARTSTOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.ledger.outgoing_prefix.trim();
        if prefix.is_empty() || prefix.contains('-') {
            return Err(ConfigError::Message(
                "ledger.outgoing_prefix must be non-empty and must not contain '-'".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/partstock".to_string(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_secs: 30,
            lock_timeout_ms: 5000,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            outgoing_prefix: DEFAULT_OUTGOING_PREFIX.to_string(),
            notification_capacity: 256,
        }
    }
}
