//! The seam between the bootstrapper and the database driver.
//!
//! The bootstrapper builds every statement itself and hands the SQL text to a
//! [`SchemaClient`]; the production implementation is [`crate::mysql::MySqlClient`].

use async_trait::async_trait;

/// A column as reported by `information_schema.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    pub name: String,
    /// `COLUMN_TYPE`, e.g. `varchar(255)` or `int(11) unsigned`.
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// `COLUMN_KEY`: `PRI`, `UNI`, `MUL` or empty.
    pub key: String,
    /// `EXTRA`, e.g. `auto_increment`.
    pub extra: String,
}

impl LiveColumn {
    pub fn is_primary_key(&self) -> bool {
        self.key.eq_ignore_ascii_case("PRI")
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }
}

/// Minimal driver surface needed to authenticate and reconcile a schema.
#[async_trait]
pub trait SchemaClient: Send + Sync {
    /// Run the connectivity probe. Succeeds once a round-trip completed.
    async fn ping(&self, sql: &str) -> Result<(), sqlx::Error>;

    /// Run an introspection query. An empty result means the table does not exist.
    async fn fetch_columns(&self, sql: &str) -> Result<Vec<LiveColumn>, sqlx::Error>;

    /// Run a DDL statement.
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error>;

    /// Release the underlying connections.
    async fn close(&self);
}
