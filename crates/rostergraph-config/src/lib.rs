//! RosterGraph Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.rostergraph/config.toml`
//! - Local config: `.rostergraph/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default roster API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.meetup.com/2/";

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "ROSTERGRAPH_API_KEY";

/// Root configuration for RosterGraph.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RosterConfig {
    /// Remote roster API
    pub api: ApiConfig,

    /// Store locations
    pub storage: StorageConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Query tuning
    pub query: QueryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote roster API configuration.
///
/// # Example TOML
///
/// ```toml
/// [api]
/// base_url = "https://api.meetup.com/2/"
/// api_key_env = "ROSTERGRAPH_API_KEY"
/// timeout_secs = 30
/// page_size = 200
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Literal API key; takes precedence over `api_key_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Members requested per roster page
    pub page_size: u32,

    /// Upper bound on roster pages followed per crawl
    pub max_pages: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            timeout_secs: 30,
            page_size: 200,
            max_pages: 1000,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for RosterGraph data (default: `.rostergraph`)
    pub data_dir: PathBuf,

    /// Relationship graph database, relative to `data_dir`
    pub graph_db: PathBuf,

    /// Member detail cache database, relative to `data_dir`
    pub details_db: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".rostergraph"),
            graph_db: PathBuf::from("graph.db"),
            details_db: PathBuf::from("details.db"),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Query configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    /// Member resolutions in flight per intersection
    pub resolve_concurrency: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            resolve_concurrency: 8,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::invalid_value(
                "logging.format",
                format!("unknown format '{}'. Valid values: text, json", s),
            )),
        }
    }
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override data directory
    pub data_dir: Option<PathBuf>,

    /// Override API base URL
    pub base_url: Option<String>,

    /// Override roster page size
    pub page_size: Option<u32>,

    /// Override server port
    pub port: Option<u16>,

    /// Override log level
    pub log_level: Option<String>,

    /// Override log format
    pub log_format: Option<LogFormat>,
}

impl RosterConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.data_dir {
            self.storage.data_dir = dir.clone();
        }

        if let Some(ref url) = overrides.base_url {
            self.api.base_url = url.clone();
        }

        if let Some(page_size) = overrides.page_size {
            self.api.page_size = page_size;
        }

        if let Some(port) = overrides.port {
            self.server.port = port;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::invalid_value("api.base_url", "must not be empty"));
        }
        if self.api.page_size == 0 {
            return Err(ConfigError::invalid_value(
                "api.page_size",
                "must be greater than zero",
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "api.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.api.max_pages == 0 {
            return Err(ConfigError::invalid_value(
                "api.max_pages",
                "must be greater than zero",
            ));
        }
        if self.query.resolve_concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "query.resolve_concurrency",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Resolve the API key from the config or the process environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Resolve the API key, reading environment variables through `lookup`.
    ///
    /// A literal `api.api_key` wins over the environment. Empty values count
    /// as unset.
    pub fn api_key_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        if let Some(key) = self.api.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        lookup(&self.api.api_key_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                env: self.api.api_key_env.clone(),
            })
    }

    /// Get the effective data directory for a working directory.
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        if self.storage.data_dir.is_absolute() {
            self.storage.data_dir.clone()
        } else {
            root.join(&self.storage.data_dir)
        }
    }

    /// Get the relationship graph database path.
    pub fn graph_path(&self, root: &Path) -> PathBuf {
        self.data_dir(root).join(&self.storage.graph_db)
    }

    /// Get the member detail cache database path.
    pub fn details_path(&self, root: &Path) -> PathBuf {
        self.data_dir(root).join(&self.storage.details_db)
    }

    /// Socket address string the server binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
