//! MySQL setup and connection helpers.

use std::time::Duration;

use async_trait::async_trait;
use botica_common::config::ConnectionConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{ConnectOptions, Connection, Row};

use crate::client::{LiveColumn, SchemaClient};

/// Production [`SchemaClient`] backed by a `sqlx` MySQL pool.
#[derive(Clone, Debug)]
pub struct MySqlClient {
    options: MySqlConnectOptions,
    connect_timeout: Duration,
    pool: MySqlPool,
}

impl MySqlClient {
    /// Build the pool without connecting. The connectivity probe opens its own
    /// connection, so an unreachable host surfaces there.
    pub fn new(config: &ConnectionConfig) -> Self {
        // Statement logging is done by the bootstrapper's QueryLogger.
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database_name)
            .disable_statement_logging();

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .min_connections(config.pool.min_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .connect_lazy_with(options.clone());

        Self {
            options,
            connect_timeout: config.pool.acquire_timeout,
            pool,
        }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl SchemaClient for MySqlClient {
    /// One direct connection attempt. Going through the pool would retry a
    /// refused connection until the acquire timeout and report `PoolTimedOut`.
    async fn ping(&self, sql: &str) -> Result<(), sqlx::Error> {
        let mut conn = tokio::time::timeout(self.connect_timeout, self.options.connect())
            .await
            .map_err(|_| {
                sqlx::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no answer within {:?}", self.connect_timeout),
                ))
            })??;
        sqlx::query(sql).fetch_one(&mut conn).await?;
        conn.close().await
    }

    async fn fetch_columns(&self, sql: &str) -> Result<Vec<LiveColumn>, sqlx::Error> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<LiveColumn, sqlx::Error> {
                let is_nullable: String = row.try_get("is_nullable")?;
                Ok(LiveColumn {
                    name: row.try_get("column_name")?,
                    column_type: row.try_get("column_type")?,
                    nullable: is_nullable.eq_ignore_ascii_case("YES"),
                    default: row.try_get("column_default")?,
                    key: row.try_get("column_key")?,
                    extra: row.try_get("extra")?,
                })
            })
            .collect()
    }

    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        // DDL goes over the text protocol; not every statement can be prepared.
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botica_common::config::{Dialect, PoolConfig, RuntimeMode};
    use std::time::Instant;

    fn config(port: u16) -> ConnectionConfig {
        ConnectionConfig {
            database_name: "botica".into(),
            username: "app".into(),
            password: String::new(),
            host: "127.0.0.1".into(),
            port,
            dialect: Dialect::MySql,
            runtime_mode: RuntimeMode::Unspecified,
            verbose_logging: false,
            pool: PoolConfig {
                acquire_timeout: Duration::from_secs(30),
                ..PoolConfig::default()
            },
        }
    }

    /// A port nothing listens on.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn refused_connection_fails_at_once_with_io_error() {
        let client = MySqlClient::new(&config(closed_port()));

        let started = Instant::now();
        let err = client.ping(crate::PING_SQL).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10), "retried for {:?}", started.elapsed());
        match err {
            sqlx::Error::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }
}
