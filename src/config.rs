//! Configuration system for the order reconciler.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `reconciler.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `CONNECTION_STRING` - Database connection URL (`postgres://...` or `sqlite:...`)
//! - `RECONCILER_DATABASE_MAX_CONNECTIONS` - Pool size
//! - `RECONCILER_DATABASE_ACQUIRE_TIMEOUT_SECS` - Seconds to wait for a pooled connection
//! - `RECONCILER_DATABASE_LOG_STATEMENTS` - Log every SQL statement at INFO
//! - `RECONCILER_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{ReconcilerError, ReconcilerResult};

/// Environment variable holding the database connection string.
pub const CONNECTION_STRING_ENV: &str = "CONNECTION_STRING";

/// Global configuration singleton.
static CONFIG: OnceLock<ReconcilerConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; the scheme selects the backend
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a connection before giving up
    pub acquire_timeout_secs: u64,
    /// Echo executed SQL statements into the log
    pub log_statements: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            log_statements: false,
        }
    }
}

impl DatabaseConfig {
    /// Backend name implied by the URL scheme, if supported.
    pub fn backend(&self) -> Option<&'static str> {
        if self.url.starts_with("sqlite:") {
            Some("sqlite")
        } else if self.url.starts_with("postgres://") || self.url.starts_with("postgresql://") {
            Some("postgres")
        } else {
            None
        }
    }

    /// Host portion of the URL with credentials stripped, safe to log.
    pub fn redacted_host(&self) -> String {
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(self.url.as_str());
        let after_credentials = without_scheme
            .rsplit_once('@')
            .map(|(_, host)| host)
            .unwrap_or(without_scheme);
        after_credentials
            .split(['/', '?'])
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `reconciler.toml` file (optional)
    /// 3. Environment variables
    ///
    /// The result is not validated; see [`ReconcilerConfig::validate`].
    pub fn load() -> ReconcilerResult<Self> {
        let settings = Config::builder()
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.log_statements", false)?
            .set_default("logging.level", "info")?
            .add_source(config::File::with_name("reconciler").required(false))
            .set_override_option("database.url", env::var(CONNECTION_STRING_ENV).ok())?
            .set_override_option(
                "database.max_connections",
                env::var("RECONCILER_DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )?
            .set_override_option(
                "database.acquire_timeout_secs",
                env::var("RECONCILER_DATABASE_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )?
            .set_override_option(
                "database.log_statements",
                env::var("RECONCILER_DATABASE_LOG_STATEMENTS")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )?
            .set_override_option("logging.level", env::var("RECONCILER_LOG_LEVEL").ok())?
            .build()
            .map_err(|e| ReconcilerError::ConfigError(format!("failed to build config: {e}")))?;

        settings.try_deserialize().map_err(|e| {
            ReconcilerError::ConfigError(format!("failed to deserialize config: {e}"))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ReconcilerResult<()> {
        if self.database.url.is_empty() {
            return Err(ReconcilerError::ConfigError(format!(
                "database.url is required (set {CONNECTION_STRING_ENV})"
            )));
        }

        if self.database.backend().is_none() {
            return Err(ReconcilerError::UnsupportedDatabase(format!(
                "expected a sqlite: or postgres:// URL, got scheme of '{}'",
                self.database.url.split(':').next().unwrap_or_default()
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ReconcilerError::ConfigError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ReconcilerError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> ReconcilerResult<&'static ReconcilerConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = ReconcilerConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is valid.
    Ok(CONFIG.get_or_init(|| config))
}
