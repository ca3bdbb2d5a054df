//! Fetch command - crawl a group's roster into the local stores

use anyhow::{Context as _, Result};
use clap::Args;
use rostergraph_config::ConfigOverrides;

use super::{build_service, ctrl_c_token, Context};

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Group URL name to crawl
    pub group: String,

    /// Members requested per roster page
    #[arg(long)]
    pub page_size: Option<u32>,
}

/// Execute the fetch command
pub async fn execute(args: FetchArgs, mut ctx: Context) -> Result<()> {
    let group = args.group.trim();
    if group.is_empty() {
        anyhow::bail!("Group name must not be empty");
    }

    ctx.config.apply_overrides(&ConfigOverrides {
        page_size: args.page_size,
        ..Default::default()
    });
    ctx.config.validate().context("Invalid configuration")?;

    let service = build_service(&ctx.config, &ctx.root)?;
    let cancel = ctrl_c_token();

    let summary = service
        .fetch_group(group, &cancel)
        .await
        .with_context(|| format!("Failed to fetch group '{}'", group))?;

    println!(
        "Fetched {}: {} members across {} pages",
        summary.group, summary.size, summary.pages
    );
    if let Some(stop) = &summary.stop {
        ctx.info(format!("Warning: roster incomplete ({})", stop));
    }

    Ok(())
}
