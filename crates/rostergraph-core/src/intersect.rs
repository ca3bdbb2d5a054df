//! Intersection Engine
//!
//! Answers "which members follow every one of these groups" by intersecting
//! reverse-adjacency sets:
//!
//! ```text
//! candidates = followers(g0)
//! for g in g1.. { candidates &= followers(g); if empty { stop } }
//! resolve(candidates)  (bounded concurrency, failures dropped)
//! ```
//!
//! [`IntersectionEngine::intersect_ids`] walks the groups in request order and
//! stops reading once the candidates run out. When every group's size is
//! wanted anyway, [`IntersectionEngine::intersect_ids_with_sizes`] reads each
//! set once and narrows from the smallest set up.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::error::IntersectError;
use crate::model::{Member, FOLLOWS};
use crate::resolver::MemberResolver;
use crate::store::EdgeStore;

/// Default number of member resolutions in flight per query
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 8;

/// Computes the members common to a set of groups.
pub struct IntersectionEngine {
    graph: Arc<dyn EdgeStore>,
    resolver: Arc<MemberResolver>,
    concurrency: usize,
}

impl IntersectionEngine {
    pub fn new(graph: Arc<dyn EdgeStore>, resolver: Arc<MemberResolver>) -> Self {
        Self {
            graph,
            resolver,
            concurrency: DEFAULT_RESOLVE_CONCURRENCY,
        }
    }

    /// Set the number of concurrent member resolutions (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Ids of members following every group in `groups`.
    ///
    /// An empty `groups` yields an empty set.
    pub fn intersect_ids<S: AsRef<str>>(
        &self,
        groups: &[S],
    ) -> Result<HashSet<String>, IntersectError> {
        let Some((first, rest)) = groups.split_first() else {
            return Ok(HashSet::new());
        };

        let mut candidates = self.graph.reverse_neighbors(first.as_ref(), FOLLOWS)?;
        debug!(group = first.as_ref(), candidates = candidates.len(), "seeded intersection");

        for group in rest {
            if candidates.is_empty() {
                break;
            }
            let followers = self.graph.reverse_neighbors(group.as_ref(), FOLLOWS)?;
            candidates.retain(|id| followers.contains(id));
            debug!(group = group.as_ref(), candidates = candidates.len(), "narrowed intersection");
        }

        Ok(candidates)
    }

    /// Ids of members following every group in `groups`, together with the
    /// follower count of each group in request order.
    ///
    /// Every group's set is read exactly once.
    pub fn intersect_ids_with_sizes<S: AsRef<str>>(
        &self,
        groups: &[S],
    ) -> Result<(HashSet<String>, Vec<(String, usize)>), IntersectError> {
        let mut sets = Vec::with_capacity(groups.len());
        for group in groups {
            sets.push(self.graph.reverse_neighbors(group.as_ref(), FOLLOWS)?);
        }

        let sizes = groups
            .iter()
            .zip(&sets)
            .map(|(group, set)| (group.as_ref().to_string(), set.len()))
            .collect();

        sets.sort_by_key(|set| set.len());
        let mut sets = sets.into_iter();
        let Some(mut candidates) = sets.next() else {
            return Ok((HashSet::new(), sizes));
        };

        for followers in sets {
            if candidates.is_empty() {
                break;
            }
            candidates.retain(|id| followers.contains(id));
        }
        debug!(groups = groups.len(), candidates = candidates.len(), "intersection narrowed");

        Ok((candidates, sizes))
    }

    /// Members following every group in `groups`, sorted by id.
    ///
    /// Members that fail to resolve are logged and left out.
    pub async fn intersect<S: AsRef<str>>(
        &self,
        groups: &[S],
    ) -> Result<Vec<Member>, IntersectError> {
        let ids = self.intersect_ids(groups)?;
        Ok(self.resolve_all(ids).await)
    }

    /// Resolve `ids` with bounded concurrency, sorted by id.
    ///
    /// Members that fail to resolve are logged and left out.
    pub async fn resolve_all(&self, ids: HashSet<String>) -> Vec<Member> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut members: Vec<Member> = stream::iter(ids)
            .map(|id| {
                let resolver = Arc::clone(&self.resolver);
                async move {
                    match resolver.resolve(&id).await {
                        Ok(member) => Some(member),
                        Err(e) => {
                            warn!(member_id = %id, error = %e, "dropping unresolvable member");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|member| async move { member })
            .collect()
            .await;

        members.sort_by_key(|m| m.id);
        members
    }
}
