//! Connection configuration loaded from environment variables and an optional config file.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > botica.toml > defaults
//!
//! The configuration is read once at startup and never reloaded. Missing or
//! malformed values are rejected here with a [`ConfigError`] naming every
//! offending variable.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

// ─── Variable names ──────────────────────────────────────────────────────────

pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_POOL_MAX: &str = "DB_POOL_MAX";
pub const DB_POOL_MIN: &str = "DB_POOL_MIN";
pub const DB_POOL_ACQUIRE_SECS: &str = "DB_POOL_ACQUIRE_SECS";
pub const DB_POOL_IDLE_SECS: &str = "DB_POOL_IDLE_SECS";
pub const NODE_ENV: &str = "NODE_ENV";

/// Optional config file, looked up in the working directory (`botica.toml`).
const CONFIG_FILE: &str = "botica";

const DEFAULT_PORT: u16 = 3306;
const DEFAULT_POOL_MAX: u32 = 5;
const DEFAULT_POOL_MIN: u32 = 0;
const DEFAULT_ACQUIRE_SECS: u64 = 60;
const DEFAULT_IDLE_SECS: u64 = 10;

// ─── Dialect & runtime mode ──────────────────────────────────────────────────

/// SQL engine the client talks to. Botica only ever targets MySQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    MySql,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
        }
    }

    /// Human-readable engine name used in log lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
        }
    }
}

/// Runtime mode taken from `NODE_ENV`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    Development,
    Production,
    Test,
    Other(String),
    #[default]
    Unspecified,
}

impl RuntimeMode {
    /// Parse the raw variable. Matching is exact: `Development` is not `development`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Unspecified,
            Some("development") => Self::Development,
            Some("production") => Self::Production,
            Some("test") => Self::Test,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection pool sizing and timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on waiting for a connection, including the very first one.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_POOL_MAX,
            min_connections: DEFAULT_POOL_MIN,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_SECS),
        }
    }
}

/// Immutable connection parameters for the process lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub dialect: Dialect,
    pub runtime_mode: RuntimeMode,
    /// Log every statement sent to the database. Only on in development mode.
    pub verbose_logging: bool,
    pub pool: PoolConfig,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dialect", &self.dialect)
            .field("runtime_mode", &self.runtime_mode)
            .field("verbose_logging", &self.verbose_logging)
            .field("pool", &self.pool)
            .finish()
    }
}

/// Flat view of the raw sources. Keys are the variable names, matched in
/// either case since the environment source may lower-case them.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(alias = "DB_NAME")]
    db_name: Option<String>,
    #[serde(alias = "DB_USER")]
    db_user: Option<String>,
    #[serde(alias = "DB_PASSWORD")]
    db_password: Option<String>,
    #[serde(alias = "DB_HOST")]
    db_host: Option<String>,
    #[serde(alias = "DB_PORT")]
    db_port: Option<String>,
    #[serde(alias = "DB_POOL_MAX")]
    db_pool_max: Option<String>,
    #[serde(alias = "DB_POOL_MIN")]
    db_pool_min: Option<String>,
    #[serde(alias = "DB_POOL_ACQUIRE_SECS")]
    db_pool_acquire_secs: Option<String>,
    #[serde(alias = "DB_POOL_IDLE_SECS")]
    db_pool_idle_secs: Option<String>,
    #[serde(alias = "NODE_ENV")]
    node_env: Option<String>,
}

impl ConnectionConfig {
    /// Read the configuration from `.env`, `botica.toml` and the process environment.
    ///
    /// Should be called once at application startup.
    pub fn load() -> ConfigResult<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(CONFIG_FILE).required(false))
            .add_source(::config::Environment::default())
            .build()?;

        let config = Self::from_raw(cfg.try_deserialize()?)?;
        tracing::debug!(
            target = %config.display_target(),
            runtime_mode = ?config.runtime_mode,
            "Loaded database configuration"
        );
        Ok(config)
    }

    /// Build the configuration from a single environment source only.
    ///
    /// Tests hand in `Environment::default().source(Some(map))` so that nothing
    /// touches the real process environment.
    pub fn from_environment(env: ::config::Environment) -> ConfigResult<Self> {
        let cfg = ::config::Config::builder().add_source(env).build()?;
        Self::from_raw(cfg.try_deserialize()?)
    }

    fn from_raw(raw: RawSettings) -> ConfigResult<Self> {
        let mut missing = Vec::new();
        let database_name = required(DB_NAME, raw.db_name, &mut missing);
        let username = required(DB_USER, raw.db_user, &mut missing);
        // An empty password is legitimate (local root accounts); absence is not.
        let password = raw.db_password.unwrap_or_else(|| {
            missing.push(DB_PASSWORD);
            String::new()
        });
        let host = required(DB_HOST, raw.db_host, &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::Missing { variables: missing });
        }

        let pool = PoolConfig {
            max_connections: parse_or(DB_POOL_MAX, raw.db_pool_max, DEFAULT_POOL_MAX)?,
            min_connections: parse_or(DB_POOL_MIN, raw.db_pool_min, DEFAULT_POOL_MIN)?,
            acquire_timeout: Duration::from_secs(parse_or(
                DB_POOL_ACQUIRE_SECS,
                raw.db_pool_acquire_secs,
                DEFAULT_ACQUIRE_SECS,
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                DB_POOL_IDLE_SECS,
                raw.db_pool_idle_secs,
                DEFAULT_IDLE_SECS,
            )?),
        };

        if pool.max_connections == 0 {
            return Err(ConfigError::Invalid {
                variable: DB_POOL_MAX,
                value: pool.max_connections.to_string(),
                reason: "the pool needs at least one connection".into(),
            });
        }
        if pool.min_connections > pool.max_connections {
            return Err(ConfigError::Invalid {
                variable: DB_POOL_MIN,
                value: pool.min_connections.to_string(),
                reason: format!("exceeds {DB_POOL_MAX} ({})", pool.max_connections),
            });
        }

        let runtime_mode = RuntimeMode::parse(raw.node_env.as_deref());

        Ok(Self {
            database_name,
            username,
            password,
            host,
            port: parse_or(DB_PORT, raw.db_port, DEFAULT_PORT)?,
            dialect: Dialect::MySql,
            verbose_logging: runtime_mode.is_development(),
            runtime_mode,
            pool,
        })
    }

    /// Connection target without credentials, e.g. `mysql://app@db:3306/botica`.
    pub fn display_target(&self) -> String {
        format!(
            "{}://{}@{}:{}/{}",
            self.dialect.as_str(),
            self.username,
            self.host,
            self.port,
            self.database_name
        )
    }
}

fn required(variable: &'static str, value: Option<String>, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(variable);
            String::new()
        }
    }
}

fn parse_or<T>(variable: &'static str, value: Option<String>, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            variable,
            value: v.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::Environment;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: ::config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map))
    }

    const BASE: [(&str, &str); 4] = [
        ("DB_NAME", "botica"),
        ("DB_USER", "app"),
        ("DB_PASSWORD", "s3cret"),
        ("DB_HOST", "db.internal"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = BASE.to_vec();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn reads_required_variables_and_defaults() {
        let cfg = ConnectionConfig::from_environment(env(&BASE)).unwrap();
        assert_eq!(cfg.database_name, "botica");
        assert_eq!(cfg.username, "app");
        assert_eq!(cfg.password, "s3cret");
        assert_eq!(cfg.host, "db.internal");
        assert_eq!(cfg.port, 3306);
        assert_eq!(cfg.dialect, Dialect::MySql);
        assert_eq!(cfg.runtime_mode, RuntimeMode::Unspecified);
        assert!(!cfg.verbose_logging);
        assert_eq!(cfg.pool, PoolConfig::default());
    }

    #[test]
    fn reports_every_missing_variable() {
        let err = ConnectionConfig::from_environment(env(&[("DB_USER", "app")])).unwrap_err();
        match err {
            ConfigError::Missing { variables } => {
                assert_eq!(variables, vec![DB_NAME, DB_PASSWORD, DB_HOST]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_host_counts_as_missing_but_empty_password_does_not() {
        let vars = [
            ("DB_NAME", "botica"),
            ("DB_USER", "root"),
            ("DB_PASSWORD", ""),
            ("DB_HOST", "   "),
        ];
        let err = ConnectionConfig::from_environment(env(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref variables } if variables == &vec![DB_HOST]));
    }

    #[test]
    fn development_mode_enables_verbose_logging() {
        let cfg = ConnectionConfig::from_environment(env(&with(&[("NODE_ENV", "development")]))).unwrap();
        assert_eq!(cfg.runtime_mode, RuntimeMode::Development);
        assert!(cfg.verbose_logging);

        for mode in ["production", "test", "Development", "staging"] {
            let vars = with(&[("NODE_ENV", mode)]);
            let cfg = ConnectionConfig::from_environment(env(&vars)).unwrap();
            assert!(!cfg.verbose_logging, "{mode} must not enable query logging");
        }
    }

    #[test]
    fn optional_tuning_is_parsed() {
        let vars = with(&[
            ("DB_PORT", "3307"),
            ("DB_POOL_MAX", "12"),
            ("DB_POOL_MIN", "2"),
            ("DB_POOL_ACQUIRE_SECS", "5"),
            ("DB_POOL_IDLE_SECS", "30"),
        ]);
        let cfg = ConnectionConfig::from_environment(env(&vars)).unwrap();
        assert_eq!(cfg.port, 3307);
        assert_eq!(cfg.pool.max_connections, 12);
        assert_eq!(cfg.pool.min_connections, 2);
        assert_eq!(cfg.pool.acquire_timeout, Duration::from_secs(5));
        assert_eq!(cfg.pool.idle_timeout, Duration::from_secs(30));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = ConnectionConfig::from_environment(env(&with(&[("DB_PORT", "mysql")]))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { variable: DB_PORT, .. }));

        let err = ConnectionConfig::from_environment(env(&with(&[("DB_POOL_MIN", "9")]))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { variable: DB_POOL_MIN, .. }));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let cfg = ConnectionConfig::from_environment(env(&BASE)).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(cfg.display_target(), "mysql://app@db.internal:3306/botica");
    }
}
