//! Read-through member resolution.
//!
//! The detail cache is consulted first. A miss falls back to the remote
//! per-member endpoint and the fresh record is written back best-effort.
//! Concurrent misses for the same id are not coalesced; each caller may issue
//! its own fetch and the cache keeps the last write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{CacheError, ResolveError};
use crate::model::{canonical_member_key, Member};
use crate::remote::RosterApi;
use crate::store::DetailCache;

/// Snapshot of resolver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverMetrics {
    /// Resolves answered from the cache
    pub cache_hits: u64,
    /// Resolves that missed the cache
    pub cache_misses: u64,
    /// Successful remote member fetches
    pub remote_fetches: u64,
    /// Cache writes after a remote fetch that failed
    pub write_through_failures: u64,
}

impl ResolverMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    remote_fetches: AtomicU64,
    write_through_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverMetrics {
        ResolverMetrics {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
            write_through_failures: self.write_through_failures.load(Ordering::Relaxed),
        }
    }
}

/// Resolves member ids to full records through the detail cache.
pub struct MemberResolver {
    cache: Arc<dyn DetailCache>,
    api: Arc<dyn RosterApi>,
    counters: Counters,
}

impl MemberResolver {
    pub fn new(cache: Arc<dyn DetailCache>, api: Arc<dyn RosterApi>) -> Self {
        Self {
            cache,
            api,
            counters: Counters::default(),
        }
    }

    /// Resolve `member_id` to a full member record.
    ///
    /// Cache misses fetch from the remote API. Decode and storage errors from
    /// the cache propagate; they do not trigger a remote fetch.
    pub async fn resolve(&self, member_id: &str) -> Result<Member, ResolveError> {
        let key = canonical_member_key(member_id)?;

        match self.cache.get_member(&key) {
            Ok(member) => {
                Counters::bump(&self.counters.cache_hits);
                trace!(member_id = %key, "member cache hit");
                return Ok(member);
            }
            Err(CacheError::NotFound(_)) => {
                Counters::bump(&self.counters.cache_misses);
                debug!(member_id = %key, "member cache miss, fetching");
            }
            Err(e) => return Err(e.into()),
        }

        let member = self.api.fetch_member(&key).await?;
        Counters::bump(&self.counters.remote_fetches);

        // Stored under the requested key; the remote record is trusted as-is.
        match member.encode() {
            Ok(bytes) => {
                if let Err(e) = self.cache.set(&key, &bytes) {
                    Counters::bump(&self.counters.write_through_failures);
                    warn!(member_id = %key, error = %e, "failed to write member to cache");
                }
            }
            Err(e) => {
                Counters::bump(&self.counters.write_through_failures);
                warn!(member_id = %key, error = %e, "failed to encode member for cache");
            }
        }

        Ok(member)
    }

    pub fn metrics(&self) -> ResolverMetrics {
        self.counters.snapshot()
    }

    pub fn cache(&self) -> &Arc<dyn DetailCache> {
        &self.cache
    }
}
