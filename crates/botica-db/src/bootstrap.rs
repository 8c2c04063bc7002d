//! Startup sequence: construct → authenticate → sync → ready.
//!
//! Single attempt, no retry. The probe opens one direct connection, bounded
//! by `DB_POOL_ACQUIRE_SECS`, so a refused connection fails immediately. Whether a failure ends the process is the
//! caller's decision; the `botica` binary exits with status 1.

use botica_common::config::{ConnectionConfig, Dialect};
use tracing::info;

use crate::client::SchemaClient;
use crate::error::BootstrapError;
use crate::mysql::MySqlClient;
use crate::query_log::QueryLogger;
use crate::schema::Schema;
use crate::sync::SyncOptions;
use crate::Database;

/// Read the configuration from the environment, then [`initialize`].
pub async fn initialize_from_env(
    schema: &Schema,
    options: SyncOptions,
) -> Result<Database, BootstrapError> {
    let config = ConnectionConfig::load()?;
    initialize(&config, schema, options).await
}

/// Build the MySQL client handle for `config` and bring the schema up to date.
pub async fn initialize(
    config: &ConnectionConfig,
    schema: &Schema,
    options: SyncOptions,
) -> Result<Database, BootstrapError> {
    info!(
        "Connecting to {} at {}...",
        config.dialect.display_name(),
        config.display_target()
    );
    let client = MySqlClient::new(config);
    initialize_with(client, QueryLogger::from_config(config), schema, options).await
}

/// Run the startup sequence against any [`SchemaClient`].
pub async fn initialize_with<C: SchemaClient>(
    client: C,
    logger: QueryLogger,
    schema: &Schema,
    options: SyncOptions,
) -> Result<Database<C>, BootstrapError> {
    let db = Database::new(client, logger);

    db.authenticate().await?;
    info!(
        "Connection to {} has been established successfully.",
        Dialect::MySql.display_name()
    );

    let report = db.sync(schema, options).await?;
    info!(
        tables = report.tables_checked,
        changes = report.applied.len(),
        "Database synchronized"
    );

    Ok(db)
}
