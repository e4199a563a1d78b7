use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            logging: LoggingConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    #[serde(default = "default_stdout_enabled")]
    pub stdout: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            stdout: default_stdout_enabled(),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Socket location and timing knobs for one bridge session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Directory prefix under `/tmp`; the user id is appended to it.
    #[serde(default = "default_socket_prefix")]
    pub socket_prefix: String,
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
    /// Upper bound a single `read_message` call waits for a full line.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Sleep between polls while the socket has no data.
    #[serde(default = "default_read_retry_ms")]
    pub read_retry_ms: u64,
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
    /// Retries after the first artwork lookup misses.
    #[serde(default = "default_artwork_attempts")]
    pub artwork_attempts: u32,
    /// Base delay; retry `n` waits `n * artwork_backoff_ms`.
    #[serde(default = "default_artwork_backoff_ms")]
    pub artwork_backoff_ms: u64,
    /// Separator the host uses inside multi-valued tags.
    #[serde(default = "default_multi_value_separator")]
    pub multi_value_separator: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            socket_prefix: default_socket_prefix(),
            socket_name: default_socket_name(),
            read_timeout_ms: default_read_timeout_ms(),
            read_retry_ms: default_read_retry_ms(),
            read_chunk_size: default_read_chunk_size(),
            artwork_attempts: default_artwork_attempts(),
            artwork_backoff_ms: default_artwork_backoff_ms(),
            multi_value_separator: default_multi_value_separator(),
        }
    }
}

impl BridgeConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn read_retry(&self) -> Duration {
        Duration::from_millis(self.read_retry_ms)
    }

    pub fn artwork_backoff(&self) -> Duration {
        Duration::from_millis(self.artwork_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.socket_name.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "bridge.socket_name",
            });
        }
        if self.multi_value_separator.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "bridge.multi_value_separator",
            });
        }
        if self.read_chunk_size == 0 {
            return Err(ValidationError::ZeroValue {
                field: "bridge.read_chunk_size",
            });
        }
        if self.read_timeout_ms == 0 {
            return Err(ValidationError::ZeroValue {
                field: "bridge.read_timeout_ms",
            });
        }
        if self.read_retry_ms > self.read_timeout_ms {
            return Err(ValidationError::RetryExceedsTimeout {
                retry_ms: self.read_retry_ms,
                timeout_ms: self.read_timeout_ms,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("read_retry_ms ({retry_ms}) exceeds read_timeout_ms ({timeout_ms})")]
    RetryExceedsTimeout { retry_ms: u64, timeout_ms: u64 },
}

impl Config {
    /// Reads and validates `config.toml`, or returns defaults if there is none.
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = dirs.config_file();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Checks the version and the bridge section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        self.bridge.validate()
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}

fn default_stdout_enabled() -> bool {
    true
}

fn default_socket_prefix() -> String {
    "mprisbee".to_string()
}

fn default_socket_name() -> String {
    "wine.sock".to_string()
}

fn default_read_timeout_ms() -> u64 {
    500
}

fn default_read_retry_ms() -> u64 {
    10
}

fn default_read_chunk_size() -> usize {
    256
}

fn default_artwork_attempts() -> u32 {
    3
}

fn default_artwork_backoff_ms() -> u64 {
    50
}

fn default_multi_value_separator() -> String {
    ";".to_string()
}
