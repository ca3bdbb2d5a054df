//! CLI command implementations

pub mod config;
pub mod fetch;
pub mod query;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use rostergraph_client::{ClientConfig, HttpRosterApi};
use rostergraph_config::{ConfigLoader, ConfigOverrides, RosterConfig};
use rostergraph_core::{
    CancellationToken, CrawlOptions, RosterService, ServiceOptions, SqliteDetailCache,
    SqliteEdgeStore,
};

/// Everything a command needs after global options are resolved.
pub struct Context {
    pub config: RosterConfig,
    /// Working directory; relative data dirs resolve against it
    pub root: PathBuf,
    pub config_file: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    /// Print an informational line unless `--quiet` was given.
    pub fn info(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }
}

/// Load configuration, with an explicit file replacing the local one.
pub fn load_config(
    config_file: Option<&Path>,
    root: &Path,
    overrides: &ConfigOverrides,
) -> Result<RosterConfig> {
    let loader = ConfigLoader::new();

    match config_file {
        Some(path) => loader
            .load_with_file(path, Some(overrides))
            .with_context(|| format!("Failed to load config file {}", path.display())),
        None => loader
            .load(root, Some(overrides))
            .context("Failed to load configuration"),
    }
}

/// Open both stores and the HTTP client and wire them into a service.
///
/// Fails before touching any store when no API key is configured.
pub fn build_service(config: &RosterConfig, root: &Path) -> Result<RosterService> {
    let api_key = config.api_key()?;

    let data_dir = config.data_dir(root);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let graph = SqliteEdgeStore::open(&config.graph_path(root))
        .context("Failed to open relationship graph")?;
    let cache = SqliteDetailCache::open(&config.details_path(root))
        .context("Failed to open member detail cache")?;

    let client = HttpRosterApi::new(
        ClientConfig::new(api_key)
            .with_base_url(&config.api.base_url)
            .with_timeout(config.api.timeout_secs),
    )
    .context("Failed to build roster API client")?;

    let options = ServiceOptions {
        crawl: CrawlOptions::default()
            .with_page_size(config.api.page_size)
            .with_max_pages(config.api.max_pages),
        resolve_concurrency: config.query.resolve_concurrency,
    };

    Ok(RosterService::new(
        Arc::new(graph),
        Arc::new(cache),
        Arc::new(client),
        options,
    ))
}

/// Token cancelled on the first Ctrl-C.
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            trigger.cancel();
        }
    });
    token
}
