//! # botica-db
//!
//! Database layer for Botica. Produces the ready-to-use client handle:
//! - **Authenticate** — open a connection and run a round-trip probe
//! - **Synchronize** — reconcile the live MySQL tables with the declared [`Schema`]
//!
//! The handle is built once by [`initialize`] and passed by value to whatever
//! needs database access; nothing here is global.

pub mod bootstrap;
pub mod client;
pub mod error;
pub mod mysql;
pub mod query_log;
pub mod schema;
pub mod sync;

pub use bootstrap::{initialize, initialize_from_env, initialize_with};
pub use client::{LiveColumn, SchemaClient};
pub use error::{BootstrapError, BootstrapErrorKind, SchemaError};
pub use mysql::MySqlClient;
pub use query_log::QueryLogger;
pub use schema::Schema;
pub use sync::{SyncOptions, SyncReport};

// Driver errors are the `source()` of every `BootstrapError`.
pub use sqlx;

use sqlx::MySqlPool;

/// Connectivity probe sent by [`Database::authenticate`].
pub const PING_SQL: &str = "SELECT 1+1 AS result";

/// Live client handle.
#[derive(Clone, Debug)]
pub struct Database<C = MySqlClient> {
    client: C,
    logger: QueryLogger,
}

impl<C: SchemaClient> Database<C> {
    pub fn new(client: C, logger: QueryLogger) -> Self {
        Self { client, logger }
    }

    /// Establish a connection and verify it with a round-trip.
    pub async fn authenticate(&self) -> Result<(), BootstrapError> {
        self.logger.log(PING_SQL);
        self.client
            .ping(PING_SQL)
            .await
            .map_err(BootstrapError::Connection)
    }

    /// Reconcile every declared table, in order. Stops at the first failure.
    pub async fn sync(
        &self,
        schema: &Schema,
        options: SyncOptions,
    ) -> Result<SyncReport, BootstrapError> {
        let mut report = SyncReport::default();

        for table in &schema.tables {
            let describe = sync::describe_table_sql(&table.name);
            self.logger.log(&describe);
            let live = self
                .client
                .fetch_columns(&describe)
                .await
                .map_err(|source| BootstrapError::Introspection {
                    table: table.name.clone(),
                    source,
                })?;

            for alteration in sync::plan_table(table, &live, options) {
                tracing::debug!(table = %alteration.table, kind = ?alteration.kind, "Applying schema change");
                self.logger.log(&alteration.sql);
                self.client
                    .execute(&alteration.sql)
                    .await
                    .map_err(|source| BootstrapError::SchemaSync {
                        table: alteration.table.clone(),
                        statement: alteration.sql.clone(),
                        source,
                    })?;
                report.applied.push(alteration);
            }
            report.tables_checked += 1;
        }

        Ok(report)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The logger used during bootstrap, for callers that want the same
    /// statement log for their own queries.
    pub fn query_logger(&self) -> &QueryLogger {
        &self.logger
    }

    /// Release the connections held by the handle.
    pub async fn close(self) {
        self.client.close().await;
    }
}

impl Database<MySqlClient> {
    pub fn pool(&self) -> &MySqlPool {
        self.client.pool()
    }
}
