//! Error types shared by Roomfinder services

use thiserror::Error;

/// Errors raised by the shared infrastructure layer
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl CoreError {
    /// Configuration error tied to a specific environment key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// The environment key responsible for a configuration error, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::ConfigurationError { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}
