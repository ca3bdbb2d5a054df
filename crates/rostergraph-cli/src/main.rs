//! RosterGraph CLI - crawl group rosters and intersect their members
//!
//! # Usage
//!
//! ```bash
//! # Crawl a group's roster into the local graph
//! rostergraph fetch rust-london
//!
//! # Members following every listed group
//! rostergraph intersect rust-london,docker-london
//!
//! # Serve the HTTP API
//! rostergraph serve --port 8080
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rostergraph_config::{ConfigOverrides, LogFormat, RosterConfig};

mod commands;

/// RosterGraph - group membership graph and intersection queries
#[derive(Parser, Debug)]
#[command(name = "rostergraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file (replaces .rostergraph/config.toml)
    #[arg(long, short = 'c', global = true, env = "ROSTERGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the graph and detail databases
    #[arg(long, global = true, env = "ROSTERGRAPH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Roster API base URL
    #[arg(long, global = true, env = "ROSTERGRAPH_BASE_URL")]
    base_url: Option<String>,

    /// Log output format (text or json)
    #[arg(long, global = true, env = "ROSTERGRAPH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            base_url: self.base_url.clone(),
            log_level,
            log_format: self.log_format,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a group's roster into the graph and detail cache
    Fetch(commands::fetch::FetchArgs),

    /// List members following every given group
    Intersect(commands::query::IntersectArgs),

    /// Count the followers of a group
    Followers(commands::query::FollowersArgs),

    /// List ingested groups
    Groups,

    /// Dump every stored edge
    Edges,

    /// Dump every cached member record
    Members,

    /// Serve the HTTP API
    Serve(commands::serve::ServeArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the config.
fn init_tracing(config: &RosterConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = std::env::current_dir().context("Failed to get current directory")?;
    let overrides = cli.global.to_config_overrides();
    let config = commands::load_config(cli.global.config.as_deref(), &root, &overrides)?;
    init_tracing(&config)?;

    let ctx = commands::Context {
        config,
        root,
        config_file: cli.global.config,
        quiet: cli.global.quiet,
    };

    match cli.command {
        Commands::Fetch(args) => commands::fetch::execute(args, ctx).await,
        Commands::Intersect(args) => commands::query::execute_intersect(args, ctx).await,
        Commands::Followers(args) => commands::query::execute_followers(args, ctx),
        Commands::Groups => commands::query::execute_groups(ctx),
        Commands::Edges => commands::query::execute_edges(ctx),
        Commands::Members => commands::query::execute_members(ctx),
        Commands::Serve(args) => commands::serve::execute(args, ctx).await,
        Commands::Config(cmd) => commands::config::execute(cmd, ctx),
    }
}
