//! Config command - View and manage configuration

use anyhow::{Context as _, Result};
use clap::Subcommand;
use rostergraph_config::ConfigLoader;

use super::Context;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Show configuration file paths
    Path,

    /// Write a default local config file if none exists
    Init,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, ctx: Context) -> Result<()> {
    match cmd {
        ConfigCommand::Show => execute_show(ctx),
        ConfigCommand::Path => execute_path(ctx),
        ConfigCommand::Init => execute_init(ctx),
    }
}

fn execute_show(ctx: Context) -> Result<()> {
    let mut config = ctx.config;
    if config.api.api_key.is_some() {
        config.api.api_key = Some("<redacted>".to_string());
    }

    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

fn execute_path(ctx: Context) -> Result<()> {
    let loader = ConfigLoader::new();

    match loader.global_config_path() {
        Some(path) => println!("global: {} (exists: {})", path.display(), path.exists()),
        None => println!("global: <no home directory>"),
    }

    let local = match ctx.config_file {
        Some(path) => path,
        None => loader.local_config_path(&ctx.root),
    };
    println!("local:  {} (exists: {})", local.display(), local.exists());

    println!("graph:   {}", ctx.config.graph_path(&ctx.root).display());
    println!("details: {}", ctx.config.details_path(&ctx.root).display());
    Ok(())
}

fn execute_init(ctx: Context) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = loader
        .init_local(&ctx.root)
        .context("Failed to write local config")?;
    ctx.info(format!("Config file: {}", path.display()));
    Ok(())
}
