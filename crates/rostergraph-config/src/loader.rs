//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.rostergraph/config.toml`
//! 2. Local config: `.rostergraph/config.toml`, or an explicit file
//! 3. CLI overrides
//!
//! Later sources override earlier ones. The merged result is validated.

use crate::error::ConfigError;
use crate::{ConfigOverrides, RosterConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global and local configuration directory name.
const CONFIG_DIR: &str = ".rostergraph";

/// Configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.rostergraph`)
    global_config_dir: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.rostergraph`).
    pub fn new() -> Self {
        Self {
            global_config_dir: dirs::home_dir().map(|h| h.join(CONFIG_DIR)),
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path under `root`.
    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for `root` with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<RosterConfig, ConfigError> {
        let local = self.load_local(root)?;
        self.merge_and_finish(local, overrides)
    }

    /// Load configuration with an explicit file in place of the local one.
    ///
    /// Unlike the local file, an explicit file must exist.
    pub fn load_with_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<RosterConfig, ConfigError> {
        debug!(path = %path.display(), "loading explicit config");
        let explicit = load_config_file(path)?;
        self.merge_and_finish(Some(explicit), overrides)
    }

    fn merge_and_finish(
        &self,
        file_config: Option<RosterConfig>,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<RosterConfig, ConfigError> {
        let mut config = RosterConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(file_config) = file_config {
            config = merge_configs(config, file_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&self) -> Result<Option<RosterConfig>, ConfigError> {
        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!(path = %global_path.display(), "global config not found");
            return Ok(None);
        }

        debug!(path = %global_path.display(), "loading global config");
        load_config_file(&global_path).map(Some)
    }

    /// Load only the local configuration under `root`.
    pub fn load_local(&self, root: &Path) -> Result<Option<RosterConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!(path = %local_path.display(), "local config not found");
            return Ok(None);
        }

        debug!(path = %local_path.display(), "loading local config");
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the local config file under `root`.
    pub fn save_local(&self, root: &Path, config: &RosterConfig) -> Result<PathBuf, ConfigError> {
        let local_path = self.local_config_path(root);
        save_config_file(&local_path, config)?;
        Ok(local_path)
    }

    /// Initialize local configuration under `root`.
    ///
    /// Creates `.rostergraph/config.toml` with default configuration. An
    /// existing file is left untouched.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let config_path = self.local_config_path(root);
        if !config_path.exists() {
            save_config_file(&config_path, &RosterConfig::default())?;
        }
        Ok(config_path)
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<RosterConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &RosterConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// A value in `overlay` wins only when it differs from the default, so a
/// partial config file does not reset values set by an earlier source.
fn merge_configs(base: RosterConfig, overlay: RosterConfig) -> RosterConfig {
    RosterConfig {
        api: merge_api(base.api, overlay.api),
        storage: merge_storage(base.storage, overlay.storage),
        server: merge_server(base.server, overlay.server),
        query: merge_query(base.query, overlay.query),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Pick `overlay` when it differs from `default`, otherwise keep `base`.
fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge API config.
fn merge_api(base: crate::ApiConfig, overlay: crate::ApiConfig) -> crate::ApiConfig {
    let default = crate::ApiConfig::default();
    crate::ApiConfig {
        base_url: pick(base.base_url, overlay.base_url, default.base_url),
        api_key_env: pick(base.api_key_env, overlay.api_key_env, default.api_key_env),
        api_key: overlay.api_key.or(base.api_key),
        timeout_secs: pick(base.timeout_secs, overlay.timeout_secs, default.timeout_secs),
        page_size: pick(base.page_size, overlay.page_size, default.page_size),
        max_pages: pick(base.max_pages, overlay.max_pages, default.max_pages),
    }
}

/// Merge storage config.
fn merge_storage(
    base: crate::StorageConfig,
    overlay: crate::StorageConfig,
) -> crate::StorageConfig {
    let default = crate::StorageConfig::default();
    crate::StorageConfig {
        data_dir: pick(base.data_dir, overlay.data_dir, default.data_dir),
        graph_db: pick(base.graph_db, overlay.graph_db, default.graph_db),
        details_db: pick(base.details_db, overlay.details_db, default.details_db),
    }
}

/// Merge server config.
fn merge_server(base: crate::ServerConfig, overlay: crate::ServerConfig) -> crate::ServerConfig {
    let default = crate::ServerConfig::default();
    crate::ServerConfig {
        bind: pick(base.bind, overlay.bind, default.bind),
        port: pick(base.port, overlay.port, default.port),
    }
}

/// Merge query config.
fn merge_query(base: crate::QueryConfig, overlay: crate::QueryConfig) -> crate::QueryConfig {
    crate::QueryConfig {
        resolve_concurrency: pick(
            base.resolve_concurrency,
            overlay.resolve_concurrency,
            crate::QueryConfig::default().resolve_concurrency,
        ),
    }
}

/// Merge logging config.
fn merge_logging(
    base: crate::LoggingConfig,
    overlay: crate::LoggingConfig,
) -> crate::LoggingConfig {
    crate::LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: pick(base.format, overlay.format, crate::LogFormat::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_local(content: &str, root: &Path) -> PathBuf {
        let config_dir = root.join(".rostergraph");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_global(content: &str, global_dir: &Path) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();
        assert_eq!(config, RosterConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        write_local(
            r#"
            [api]
            base_url = "http://localhost:9999/2/"
            page_size = 50

            [storage]
            data_dir = "/srv/roster"
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.api.base_url, "http://localhost:9999/2/");
        assert_eq!(config.api.page_size, 50);
        assert_eq!(config.api.max_pages, 1000);
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/roster"));
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        write_global(
            r#"
            [logging]
            level = "debug"
            format = "json"

            [server]
            port = 9000
            "#,
            &global_dir,
        );
        write_local(
            r#"
            [server]
            port = 9100
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.server.port, 9100);
        // Global values the local file does not set survive
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();
        write_local(
            r#"
            [server]
            port = 9100
            "#,
            temp.path(),
        );

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let overrides = ConfigOverrides {
            port: Some(7000),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_explicit_file_replaces_local() {
        let temp = TempDir::new().unwrap();
        write_local("[server]\nport = 9100\n", temp.path());
        let explicit = temp.path().join("custom.toml");
        std::fs::write(&explicit, "[query]\nresolve_concurrency = 2\n").unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_with_file(&explicit, None).unwrap();

        assert_eq!(config.query.resolve_concurrency, 2);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let err = loader
            .load_with_file(&temp.path().join("missing.toml"), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = write_local("[api\nbase_url = ", temp.path());

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        match loader.load(temp.path(), None) {
            Err(ConfigError::ParseToml { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ParseToml, got {:?}", other),
        }
    }

    #[test]
    fn test_merged_config_is_validated() {
        let temp = TempDir::new().unwrap();
        write_local("[api]\nmax_pages = 0\n", temp.path());

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "api.max_pages"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = RosterConfig::default();
        config.api.base_url = "http://saved:8000/".to_string();
        config.logging.level = "warn".to_string();
        loader.save_local(temp.path(), &config).unwrap();

        let loaded = loader.load(temp.path(), None).unwrap();
        assert_eq!(loaded.api.base_url, "http://saved:8000/");
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".rostergraph/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: RosterConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, RosterConfig::default());
    }

    #[test]
    fn test_init_local_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = write_local("[server]\nport = 1234\n", temp.path());

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        loader.init_local(temp.path()).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("1234"));
    }

    #[test]
    fn test_api_key_merge_keeps_base() {
        let base = crate::ApiConfig {
            api_key: Some("global-key".into()),
            ..Default::default()
        };
        let overlay = crate::ApiConfig {
            timeout_secs: 5,
            ..Default::default()
        };

        let merged = merge_api(base, overlay);
        assert_eq!(merged.api_key.as_deref(), Some("global-key"));
        assert_eq!(merged.timeout_secs, 5);
    }
}
