//! Roster service: the single entry point the CLI and HTTP server talk to.
//!
//! Wires the crawler, both stores, the resolver and the intersection engine
//! together. All collaborators are shared handles, so a service can be cloned
//! cheaply into request handlers.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::crawler::{CrawlOptions, CrawlStop, RosterCrawler};
use crate::error::{ResolveError, ServiceError};
use crate::intersect::{IntersectionEngine, DEFAULT_RESOLVE_CONCURRENCY};
use crate::model::{Edge, Member, FOLLOWS};
use crate::remote::RosterApi;
use crate::resolver::{MemberResolver, ResolverMetrics};
use crate::store::{DetailCache, EdgeStore, MemberScan};

/// Service tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub crawl: CrawlOptions,
    pub resolve_concurrency: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            crawl: CrawlOptions::default(),
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
        }
    }
}

/// Result of ingesting one group.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSummary {
    pub group: String,
    /// Members written to the graph
    pub size: usize,
    /// Roster pages read
    pub pages: usize,
    /// Set when the crawl ended before the roster was exhausted
    pub stop: Option<CrawlStop>,
}

/// Result of an intersection query.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectReport {
    /// Members following every requested group, sorted by id
    pub members: Vec<Member>,
    /// Follower count of each requested group, in request order
    pub group_sizes: Vec<(String, usize)>,
}

impl IntersectReport {
    /// Number of members in the intersection.
    pub fn intersected(&self) -> usize {
        self.members.len()
    }
}

/// Facade over crawling, storage and queries.
#[derive(Clone)]
pub struct RosterService {
    graph: Arc<dyn EdgeStore>,
    cache: Arc<dyn DetailCache>,
    crawler: Arc<RosterCrawler>,
    resolver: Arc<MemberResolver>,
    engine: Arc<IntersectionEngine>,
}

impl RosterService {
    pub fn new(
        graph: Arc<dyn EdgeStore>,
        cache: Arc<dyn DetailCache>,
        api: Arc<dyn RosterApi>,
        options: ServiceOptions,
    ) -> Self {
        let crawler = Arc::new(RosterCrawler::with_options(Arc::clone(&api), options.crawl));
        let resolver = Arc::new(MemberResolver::new(Arc::clone(&cache), api));
        let engine = Arc::new(
            IntersectionEngine::new(Arc::clone(&graph), Arc::clone(&resolver))
                .with_concurrency(options.resolve_concurrency),
        );

        Self {
            graph,
            cache,
            crawler,
            resolver,
            engine,
        }
    }

    /// Crawl `group` and record every member in the graph and detail cache.
    ///
    /// Edges for the whole crawl are written as one batch before the member
    /// records. A storage failure aborts the ingest and is returned.
    #[instrument(skip(self, cancel))]
    pub async fn fetch_group(
        &self,
        group: &str,
        cancel: &CancellationToken,
    ) -> Result<FetchSummary, ServiceError> {
        let outcome = self.crawler.crawl(group, cancel).await?;

        let edges: Vec<Edge> = outcome
            .members
            .iter()
            .map(|member| Edge::follows(member, group))
            .collect();
        self.graph.add_edges(&edges)?;

        for member in &outcome.members {
            self.cache.put_member(member)?;
        }

        info!(
            group,
            size = outcome.members.len(),
            pages = outcome.pages,
            complete = outcome.is_complete(),
            "group ingested"
        );

        Ok(FetchSummary {
            group: group.to_string(),
            size: outcome.members.len(),
            pages: outcome.pages,
            stop: outcome.stop,
        })
    }

    /// Groups with at least one recorded follower, sorted.
    pub fn list_groups(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.graph.objects(FOLLOWS)?)
    }

    /// Number of distinct members following `group`.
    pub fn follower_count(&self, group: &str) -> Result<usize, ServiceError> {
        Ok(self.graph.reverse_neighbors(group, FOLLOWS)?.len())
    }

    /// Members following every group in `groups`.
    ///
    /// Repeated group ids are collapsed, first occurrence wins.
    #[instrument(skip(self))]
    pub async fn intersect(&self, groups: &[String]) -> Result<IntersectReport, ServiceError> {
        let groups = dedup_groups(groups);

        let (ids, group_sizes) = self.engine.intersect_ids_with_sizes(&groups)?;
        let members = self.engine.resolve_all(ids).await;
        info!(groups = groups.len(), intersected = members.len(), "intersection done");

        Ok(IntersectReport {
            members,
            group_sizes,
        })
    }

    /// Resolve a single member through the cache.
    pub async fn resolve(&self, member_id: &str) -> Result<Member, ResolveError> {
        self.resolver.resolve(member_id).await
    }

    /// Every stored edge, in storage order.
    pub fn edges(&self) -> Result<Vec<Edge>, ServiceError> {
        Ok(self.graph.all_edges()?)
    }

    /// Lazily scan the detail cache. Corrupted records are skipped.
    pub fn cached_members(&self) -> MemberScan<'_> {
        self.cache.scan_all()
    }

    pub fn resolver_metrics(&self) -> ResolverMetrics {
        self.resolver.metrics()
    }
}

fn dedup_groups(groups: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .filter(|g| seen.insert(g.as_str()))
        .cloned()
        .collect()
}
