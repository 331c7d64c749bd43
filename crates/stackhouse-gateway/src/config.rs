//! Gateway configuration types.
//!
//! Configuration is read from an optional JSON or YAML file and then
//! overridden by environment variables. Files ending in `.yaml` or `.yml` are
//! parsed as YAML, anything else as JSON. Every section and field has a default, so a file
//! only needs to name what it changes.
//!
//! | Variable              | Overrides                        |
//! |-----------------------|----------------------------------|
//! | `STACKHOUSE_CONFIG`   | path of the config file          |
//! | `LISTEN_ADDR`         | `server.listen_addr`             |
//! | `DATA_DIR`            | `database.path`                  |
//! | `DOCKER_HOST`         | `runtime.endpoint`               |
//! | `STACKHOUSE_API_KEYS` | `api.keys` (comma-separated)     |
//! | `LOG_LEVEL`           | `logging.level`                  |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stackhouse_control::ControlConfig;
use stackhouse_runtime::RuntimeConfig;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "STACKHOUSE_CONFIG";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The configuration file is not valid YAML for this schema.
    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// API access settings.
    pub api: ApiConfig,
    /// Definition store settings.
    pub database: DatabaseConfig,
    /// Container runtime settings.
    pub runtime: RuntimeSection,
    /// Log output settings.
    pub logging: LoggingConfig,
    /// Log retrieval limits.
    pub logs: LogsConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:3001").
    #[serde(default = "ServerConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default = "ServerConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "ServerConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "ServerConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ServerConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:3001".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        10 * 1024 * 1024 // 10 MiB
    }

    const fn default_request_timeout() -> u64 {
        60
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// API access settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Accepted values of the `X-API-Key` header.
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Definition store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `RocksDB` data directory.
    #[serde(default = "DatabaseConfig::default_path")]
    pub path: PathBuf,
}

impl DatabaseConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("./data/stacks")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// Container runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// Daemon endpoint.
    #[serde(default = "RuntimeSection::default_endpoint")]
    pub endpoint: String,

    /// Client request timeout in seconds.
    #[serde(default = "RuntimeSection::default_timeout")]
    pub timeout_seconds: u64,

    /// Grace period before a stopping container is killed, in seconds.
    #[serde(default = "RuntimeSection::default_stop_timeout")]
    pub stop_timeout_seconds: i64,
}

impl RuntimeSection {
    fn default_endpoint() -> String {
        "unix:///var/run/docker.sock".to_string()
    }

    const fn default_timeout() -> u64 {
        120
    }

    const fn default_stop_timeout() -> i64 {
        10
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            timeout_seconds: Self::default_timeout(),
            stop_timeout_seconds: Self::default_stop_timeout(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Log retrieval limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Lines returned when a request does not ask for a tail.
    #[serde(default = "LogsConfig::default_tail")]
    pub default_tail: usize,

    /// Upper bound on a requested tail.
    #[serde(default = "LogsConfig::default_max_tail")]
    pub max_tail: usize,
}

impl LogsConfig {
    const fn default_tail() -> usize {
        100
    }

    const fn default_max_tail() -> usize {
        10_000
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            default_tail: Self::default_tail(),
            max_tail: Self::default_max_tail(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from an optional JSON or YAML file.
    ///
    /// Without a path the defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Load configuration from `STACKHOUSE_CONFIG` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the named file cannot be read or parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = Self::load(path.as_deref())?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.database.path = PathBuf::from(dir);
        }
        if let Some(endpoint) = lookup("DOCKER_HOST") {
            self.runtime.endpoint = endpoint;
        }
        if let Some(keys) = lookup("STACKHOUSE_API_KEYS") {
            self.api.keys = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Settings for the container runtime client.
    #[must_use]
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            endpoint: self.runtime.endpoint.clone(),
            timeout_secs: self.runtime.timeout_seconds,
            stop_timeout_secs: self.runtime.stop_timeout_seconds,
        }
    }

    /// Settings for the control plane.
    #[must_use]
    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            default_log_tail: self.logs.default_tail,
            max_log_tail: self.logs.max_tail,
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}
