//! # Roomfinder Core
//!
//! Shared infrastructure for Roomfinder services.
//!
//! ## Modules
//!
//! - `config`: Environment configuration loading and validation
//! - `database`: Shared PostgreSQL connection pool
//! - `error`: Error types for the infrastructure layer
//! - `observability`: Structured logging initialisation

pub mod config;
pub mod database;
pub mod error;
pub mod observability;

pub use config::{load_dotenv, ConfigLoader, DatabaseConfig, ServiceConfig};
pub use database::{DatabasePool, PoolStats};
pub use error::CoreError;
pub use observability::{init_logging, LogConfig, LogFormat, ObservabilityError};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
