//! Configuration error types.

use thiserror::Error;

/// Errors raised while reading the connection configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required variables were absent (or blank where a value is
    /// mandatory). All of them are reported at once.
    #[error("Missing required configuration: {}", .variables.join(", "))]
    Missing { variables: Vec<&'static str> },

    #[error("Invalid value '{value}' for {variable}: {reason}")]
    Invalid {
        variable: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration")]
    Load(#[from] ::config::ConfigError),
}

/// Convenience type alias for Results using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
