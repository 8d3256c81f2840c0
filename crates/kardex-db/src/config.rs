//! Database configuration.
//!
//! Built in code with the `DbConfig` builder, or loaded from environment
//! variables with fallback to defaults:
//!
//! | Variable                     | Default      |
//! |------------------------------|--------------|
//! | `KARDEX_DB_PATH`             | `kardex.db`  |
//! | `KARDEX_DB_MAX_CONNECTIONS`  | `5`          |
//! | `KARDEX_DB_BUSY_TIMEOUT_MS`  | `5000`       |
//! | `KARDEX_DB_RUN_MIGRATIONS`   | `true`       |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const ENV_DB_PATH: &str = "KARDEX_DB_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "KARDEX_DB_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "KARDEX_DB_BUSY_TIMEOUT_MS";
pub const ENV_RUN_MIGRATIONS: &str = "KARDEX_DB_RUN_MIGRATIONS";

/// Database configuration.
///
/// ## Example
/// ```rust
/// use kardex_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/kardex/kardex.db")
///     .max_connections(8)
///     .run_migrations(false);
/// assert_eq!(config.max_connections, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a pooled connection. Default: 30 seconds
    pub connect_timeout: Duration,

    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long SQLite waits on a locked database before failing a write.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// A single connection, so every query sees the same in-memory database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = DbConfig::new("kardex.db");

        let database_path = lookup(ENV_DB_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let max_connections = match lookup(ENV_MAX_CONNECTIONS) {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()))?,
            None => defaults.max_connections,
        };

        let busy_timeout = match lookup(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue(ENV_BUSY_TIMEOUT_MS.to_string()))?,
            None => defaults.busy_timeout,
        };

        let run_migrations = match lookup(ENV_RUN_MIGRATIONS) {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidValue(ENV_RUN_MIGRATIONS.to_string()))?,
            None => defaults.run_migrations,
        };

        Ok(DbConfig {
            database_path,
            max_connections,
            min_connections: defaults.min_connections.min(max_connections),
            busy_timeout,
            run_migrations,
            ..defaults
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
