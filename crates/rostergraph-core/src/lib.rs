//! RosterGraph Core - membership graph and group intersection
//!
//! This crate provides the core functionality behind RosterGraph:
//! - Append-only relationship graph (`member --follows--> group`)
//! - Detail cache of versioned member records
//! - Bounded, cancellable roster crawling over a paginated remote API
//! - Read-through member resolution
//! - Intersection queries over reverse-adjacency sets

pub mod crawler;
pub mod error;
pub mod intersect;
pub mod model;
pub mod remote;
pub mod resolver;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use crawler::{CrawlOptions, CrawlOutcome, CrawlStop, RosterCrawler};
pub use error::{
    CacheError, CrawlError, DecodeError, IntersectError, RemoteError, ResolveError, ServiceError,
    StoreError,
};
pub use intersect::{IntersectionEngine, DEFAULT_RESOLVE_CONCURRENCY};
pub use model::{canonical_member_key, member_key, Edge, Member, FOLLOWS};
pub use remote::{PageCursor, RosterApi, RosterMeta, RosterPage};
pub use resolver::{MemberResolver, ResolverMetrics};
pub use service::{FetchSummary, IntersectReport, RosterService, ServiceOptions};
pub use store::{
    DetailCache, EdgeStore, MemberScan, MemoryDetailCache, MemoryEdgeStore, SqliteDetailCache,
    SqliteEdgeStore,
};

// tokio-util's token is part of the crawl API
pub use tokio_util::sync::CancellationToken;
