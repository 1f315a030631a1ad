//! Shared configuration loader for Roomfinder services
//!
//! All variables use the `ROOMFINDER_` prefix. Override order is
//! defaults < .env < environment.
//!
//! # Example
//!
//! ```no_run
//! use roomfinder_core::config::{load_dotenv, ConfigLoader, DatabaseConfig, ServiceConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//!
//! let db_config = DatabaseConfig::from_env()?;
//! let service_config = ServiceConfig::from_env()?;
//!
//! db_config.validate()?;
//! service_config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::error::CoreError;
use std::time::Duration;
use url::Url;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, using defaults for
    /// missing optional values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if a required variable is missing or a
    /// value cannot be parsed.
    fn from_env() -> Result<Self, CoreError>;

    /// Validate configuration values
    fn validate(&self) -> Result<(), CoreError>;
}

/// Database configuration
///
/// # Environment Variables
///
/// - `ROOMFINDER_DATABASE_URL` (required, falls back to `DATABASE_URL`)
/// - `ROOMFINDER_DATABASE_MAX_CONNECTIONS` (default: 10)
/// - `ROOMFINDER_DATABASE_MIN_CONNECTIONS` (default: 1)
/// - `ROOMFINDER_DATABASE_CONNECT_TIMEOUT` seconds (default: 10)
/// - `ROOMFINDER_DATABASE_IDLE_TIMEOUT` seconds (default: 600)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle connection timeout duration
    pub idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/roomfinder".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, CoreError> {
        let url = std::env::var("ROOMFINDER_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                CoreError::config(
                    "DATABASE_URL or ROOMFINDER_DATABASE_URL must be set",
                    "ROOMFINDER_DATABASE_URL",
                )
            })?;

        let defaults = DatabaseConfig::default();

        let max_connections =
            parse_env_var("ROOMFINDER_DATABASE_MAX_CONNECTIONS", defaults.max_connections)?;
        let min_connections =
            parse_env_var("ROOMFINDER_DATABASE_MIN_CONNECTIONS", defaults.min_connections)?;
        let connect_timeout_secs = parse_env_var(
            "ROOMFINDER_DATABASE_CONNECT_TIMEOUT",
            defaults.connect_timeout.as_secs(),
        )?;
        let idle_timeout_secs = parse_env_var(
            "ROOMFINDER_DATABASE_IDLE_TIMEOUT",
            defaults.idle_timeout.as_secs(),
        )?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            idle_timeout: Duration::from_secs(idle_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        Url::parse(&self.url).map_err(|e| {
            CoreError::config(
                format!("Invalid DATABASE_URL: {}", e),
                "ROOMFINDER_DATABASE_URL",
            )
        })?;

        if self.max_connections == 0 {
            return Err(CoreError::config(
                "max_connections must be greater than 0",
                "ROOMFINDER_DATABASE_MAX_CONNECTIONS",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(CoreError::config(
                format!(
                    "min_connections ({}) cannot exceed max_connections ({})",
                    self.min_connections, self.max_connections
                ),
                "ROOMFINDER_DATABASE_MIN_CONNECTIONS",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(CoreError::config(
                "connect_timeout must be greater than 0 seconds",
                "ROOMFINDER_DATABASE_CONNECT_TIMEOUT",
            ));
        }

        Ok(())
    }
}

/// HTTP service configuration
///
/// # Environment Variables
///
/// - `ROOMFINDER_SERVICE_HOST` (default: "0.0.0.0", falls back to `HOST`)
/// - `ROOMFINDER_SERVICE_PORT` (default: 8083, falls back to `PORT`)
/// - `ROOMFINDER_SERVICE_WORKERS` (default: CPU count)
/// - `ROOMFINDER_SERVICE_LOG_LEVEL` (default: "info", falls back to `RUST_LOG`)
/// - `ROOMFINDER_SERVICE_LOG_FORMAT` (default: "json")
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (json, pretty)
    pub log_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8083,
            workers: num_cpus::get(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ConfigLoader for ServiceConfig {
    fn from_env() -> Result<Self, CoreError> {
        let defaults = ServiceConfig::default();

        let host = std::env::var("ROOMFINDER_SERVICE_HOST")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or(defaults.host);

        let port = match std::env::var("ROOMFINDER_SERVICE_PORT") {
            Ok(_) => parse_env_var("ROOMFINDER_SERVICE_PORT", defaults.port)?,
            Err(_) => parse_env_var("PORT", defaults.port)?,
        };

        let workers = parse_env_var("ROOMFINDER_SERVICE_WORKERS", defaults.workers)?;

        let log_level = std::env::var("ROOMFINDER_SERVICE_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(defaults.log_level);

        let log_format =
            std::env::var("ROOMFINDER_SERVICE_LOG_FORMAT").unwrap_or(defaults.log_format);

        Ok(Self {
            host,
            port,
            workers,
            log_level,
            log_format,
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.port == 0 {
            return Err(CoreError::config(
                "port must be greater than 0",
                "ROOMFINDER_SERVICE_PORT",
            ));
        }

        if self.workers == 0 {
            return Err(CoreError::config(
                "workers must be greater than 0",
                "ROOMFINDER_SERVICE_WORKERS",
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(CoreError::config(
                format!(
                    "Invalid log_level '{}'. Must be one of: {}",
                    self.log_level,
                    valid_log_levels.join(", ")
                ),
                "ROOMFINDER_SERVICE_LOG_LEVEL",
            ));
        }

        if !matches!(self.log_format.to_lowercase().as_str(), "json" | "pretty") {
            return Err(CoreError::config(
                format!("Invalid log_format '{}'. Must be json or pretty", self.log_format),
                "ROOMFINDER_SERVICE_LOG_FORMAT",
            ));
        }

        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset
///
/// # Errors
///
/// Returns a `ConfigurationError` if the value is set but cannot be parsed
pub(crate) fn parse_env_var<T>(key: &str, default: T) -> Result<T, CoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| CoreError::config(format!("Failed to parse {}: {}", key, e), key))
        })
        .unwrap_or(Ok(default))
}

/// Load .env file if present
///
/// A missing file is not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
