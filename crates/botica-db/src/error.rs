//! Database bootstrap error types.

use std::path::PathBuf;

use botica_common::error::ConfigError;
use thiserror::Error;

/// Errors that abort startup. Any of them means the process must not serve.
///
/// Messages name the failing step only; the driver error is the `source()`.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    // ── Connectivity ────────────────────────────────────────────────────────

    #[error("Connection check failed")]
    Connection(#[source] sqlx::Error),

    // ── Schema synchronization ──────────────────────────────────────────────

    #[error("Failed to inspect table `{table}`")]
    Introspection {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema synchronization failed on table `{table}` while running `{statement}`")]
    SchemaSync {
        table: String,
        statement: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Coarse classification used in the fatal log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapErrorKind {
    Configuration,
    Connectivity,
    SchemaSync,
}

impl BootstrapError {
    pub fn kind(&self) -> BootstrapErrorKind {
        match self {
            Self::Config(_) => BootstrapErrorKind::Configuration,
            Self::Connection(_) => BootstrapErrorKind::Connectivity,
            Self::Introspection { .. } | Self::SchemaSync { .. } => BootstrapErrorKind::SchemaSync,
        }
    }
}

/// Errors raised while loading or validating a declared schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed schema")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid definition for table `{table}`: {message}")]
    Invalid { table: String, message: String },
}
