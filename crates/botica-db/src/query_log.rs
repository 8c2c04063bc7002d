//! Statement logging for the bootstrapper.

use std::fmt;
use std::sync::Arc;

use botica_common::config::ConnectionConfig;

/// Where executed statements are reported, if anywhere.
#[derive(Clone, Default)]
pub enum QueryLogger {
    #[default]
    Disabled,
    /// One `info` event per statement on the `botica::sql` target.
    Tracing,
    /// Hand each formatted line to a callback.
    Custom(Arc<dyn Fn(&str) + Send + Sync>),
}

impl QueryLogger {
    /// Statement logging is on only in development mode.
    pub fn from_config(config: &ConnectionConfig) -> Self {
        if config.verbose_logging {
            Self::Tracing
        } else {
            Self::Disabled
        }
    }

    pub fn custom(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Report a statement about to be sent.
    pub fn log(&self, sql: &str) {
        match self {
            Self::Disabled => {}
            Self::Tracing => tracing::info!(target: "botica::sql", "Executing (default): {sql}"),
            Self::Custom(f) => f(&format!("Executing (default): {sql}")),
        }
    }
}

impl fmt::Debug for QueryLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Tracing => f.write_str("Tracing"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn custom_logger_receives_formatted_lines() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = QueryLogger::custom(move |line| sink.lock().unwrap().push(line.to_string()));

        logger.log("SELECT 1+1 AS result");
        assert!(logger.is_enabled());
        assert_eq!(*lines.lock().unwrap(), ["Executing (default): SELECT 1+1 AS result"]);
    }

    #[test]
    fn disabled_by_default() {
        assert!(!QueryLogger::default().is_enabled());
    }
}
