//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use domain::{DEFAULT_MAX_WRITE_RETRIES, DEFAULT_RETRY_BACKOFF};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `5000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `json` for structured logs, anything else for human-readable
/// - `DATABASE_URL` — PostgreSQL connection string; unset means in-memory storage
/// - `PERSISTENCE_TIMEOUT_MS` — bound on each store call (default: `5000`)
/// - `MAX_WRITE_RETRIES` — attempts per write before a conflict is reported (default: `3`)
/// - `RETRY_BACKOFF_MS` — base delay between conflicting write attempts (default: `5`)
/// - `NOTIFY_TIMEOUT_MS` — bound on each notification delivery (default: `2000`)
/// - `DIRECTORY_PATH` — JSON file with staff and menu items used to populate queries
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub persistence_timeout: Duration,
    pub max_write_retries: u32,
    pub retry_backoff: Duration,
    pub notify_timeout: Duration,
    pub directory_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            persistence_timeout: millis("PERSISTENCE_TIMEOUT_MS", defaults.persistence_timeout),
            max_write_retries: lookup("MAX_WRITE_RETRIES")
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_write_retries),
            retry_backoff: millis("RETRY_BACKOFF_MS", defaults.retry_backoff),
            notify_timeout: millis("NOTIFY_TIMEOUT_MS", defaults.notify_timeout),
            directory_path: lookup("DIRECTORY_PATH")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            persistence_timeout: Duration::from_secs(5),
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            notify_timeout: Duration::from_secs(2),
            directory_path: None,
        }
    }
}
