//! Configuration management for chronometer
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables. Command-line flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use crate::server::config::ServerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Timer storage configuration
    pub storage: StorageConfig,

    /// Tick scheduler configuration
    pub ticker: TickerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Which [`TimerStore`](crate::storage::TimerStore) backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    Sqlite,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(ConfigError::InvalidValue {
                field: "storage.backend".to_string(),
                reason: format!("unknown backend '{other}' (expected memory, file or sqlite)"),
            }),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind
    pub backend: StorageBackend,

    /// JSON snapshot path (file backend)
    pub snapshot_path: PathBuf,

    /// SQLite database path (sqlite backend)
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            snapshot_path: PathBuf::from("data/timers.json"),
            sqlite_path: PathBuf::from("data/timers.db"),
        }
    }
}

/// Tick scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Period between ticks in milliseconds
    pub interval_ms: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl TickerConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (if given) then environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(port) = env_var("PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid("PORT", format!("not a port number: {port}")))?;
            self.server.bind_address.set_port(port);
        }

        if let Some(host) = env_var("CHRONOMETER_HOST") {
            let ip = host.parse::<IpAddr>().map_err(|_| {
                ConfigError::invalid("CHRONOMETER_HOST", format!("not an IP address: {host}"))
            })?;
            self.server.bind_address.set_ip(ip);
        }

        if let Some(backend) = env_var("CHRONOMETER_STORAGE") {
            self.storage.backend = backend.parse()?;
        }

        if let Some(path) = env_var("CHRONOMETER_SNAPSHOT_PATH") {
            self.storage.snapshot_path = PathBuf::from(path);
        }

        if let Some(path) = env_var("CHRONOMETER_SQLITE_PATH") {
            self.storage.sqlite_path = PathBuf::from(path);
        }

        if let Some(ms) = env_var("CHRONOMETER_TICK_INTERVAL_MS") {
            self.ticker.interval_ms = ms.parse().map_err(|_| {
                ConfigError::invalid("CHRONOMETER_TICK_INTERVAL_MS", format!("not an integer: {ms}"))
            })?;
        }

        if let Some(cors) = env_var("CHRONOMETER_CORS") {
            self.server.enable_cors = parse_bool(&cors)
                .ok_or_else(|| ConfigError::invalid("CHRONOMETER_CORS", format!("not a boolean: {cors}")))?;
        }

        if let Some(dir) = env_var("CHRONOMETER_STATIC_DIR") {
            self.server.static_dir = Some(dir);
        }

        if let Some(level) = env_var("CHRONOMETER_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = env_var("CHRONOMETER_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;

        if self.ticker.interval_ms == 0 {
            return Err(ConfigError::invalid(
                "ticker.interval_ms",
                "must be greater than 0",
            ));
        }

        match self.storage.backend {
            StorageBackend::File if self.storage.snapshot_path.as_os_str().is_empty() => {
                return Err(ConfigError::invalid(
                    "storage.snapshot_path",
                    "required for the file backend",
                ));
            }
            StorageBackend::Sqlite if self.storage.sqlite_path.as_os_str().is_empty() => {
                return Err(ConfigError::invalid(
                    "storage.sqlite_path",
                    "required for the sqlite backend",
                ));
            }
            _ => {}
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::invalid(
                "logging.format",
                format!("expected text or json, got '{}'", self.logging.format),
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
