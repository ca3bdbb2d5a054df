//! Query commands - intersections and store dumps

use anyhow::{Context as _, Result};
use clap::Args;

use super::{build_service, Context};

/// Arguments for the intersect command
#[derive(Args, Debug)]
pub struct IntersectArgs {
    /// Groups to intersect; each argument may be a comma-separated list
    #[arg(required = true, num_args = 1..)]
    pub groups: Vec<String>,
}

/// Arguments for the followers command
#[derive(Args, Debug)]
pub struct FollowersArgs {
    /// Group URL name
    pub group: String,
}

/// Split comma-separated group lists, dropping whitespace and empty entries.
pub fn parse_group_list<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(|g| g.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|g| !g.is_empty())
        .collect()
}

/// Execute the intersect command
pub async fn execute_intersect(args: IntersectArgs, ctx: Context) -> Result<()> {
    let groups = parse_group_list(&args.groups);
    if groups.is_empty() {
        anyhow::bail!("At least one group is required");
    }

    let service = build_service(&ctx.config, &ctx.root)?;
    let report = service
        .intersect(&groups)
        .await
        .context("Intersection failed")?;

    for (group, size) in &report.group_sizes {
        ctx.info(format!("{}: {} members", group, size));
    }

    let joined = report
        .group_sizes
        .iter()
        .map(|(g, _)| g.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    for member in &report.members {
        println!(
            "{} (ID {}) belongs to: [{}]",
            member.name, member.id, joined
        );
    }

    ctx.info(format!("Intersected: {} members", report.intersected()));
    let metrics = service.resolver_metrics();
    tracing::debug!(
        cache_hits = metrics.cache_hits,
        cache_misses = metrics.cache_misses,
        remote_fetches = metrics.remote_fetches,
        "resolver metrics"
    );

    Ok(())
}

/// Execute the followers command
pub fn execute_followers(args: FollowersArgs, ctx: Context) -> Result<()> {
    let service = build_service(&ctx.config, &ctx.root)?;
    let count = service.follower_count(args.group.trim())?;
    println!("{}", count);
    Ok(())
}

/// Execute the groups command
pub fn execute_groups(ctx: Context) -> Result<()> {
    let service = build_service(&ctx.config, &ctx.root)?;
    for group in service.list_groups()? {
        println!("{}", group);
    }
    Ok(())
}

/// Execute the edges command
pub fn execute_edges(ctx: Context) -> Result<()> {
    let service = build_service(&ctx.config, &ctx.root)?;
    for edge in service.edges()? {
        println!("{}", edge);
    }
    Ok(())
}

/// Execute the members command
pub fn execute_members(ctx: Context) -> Result<()> {
    let service = build_service(&ctx.config, &ctx.root)?;

    let mut scan = service.cached_members();
    let mut count = 0usize;
    for member in scan.by_ref() {
        let member = member.context("Failed to scan member cache")?;
        println!("{}\t{}\t{}", member.id, member.name, member.city);
        count += 1;
    }

    ctx.info(format!("{} members", count));
    if scan.skipped() > 0 {
        ctx.info(format!("Skipped {} unreadable records", scan.skipped()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_list_mixes_commas_and_args() {
        let args = vec!["rust-london, docker-london".to_string(), "go-ldn".to_string()];
        assert_eq!(
            parse_group_list(&args),
            vec!["rust-london", "docker-london", "go-ldn"]
        );
    }

    #[test]
    fn test_parse_group_list_drops_empty_entries() {
        assert_eq!(parse_group_list(&[",, a ,"]), vec!["a"]);
        assert!(parse_group_list(&[" , "]).is_empty());
    }

    #[test]
    fn test_parse_group_list_strips_inner_spaces() {
        assert_eq!(parse_group_list(&["rust london"]), vec!["rustlondon"]);
    }
}
