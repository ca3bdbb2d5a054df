//! Storage Module
//!
//! Two independently consistent stores back the system:
//! - [`EdgeStore`]: append-only labeled graph with reverse-adjacency lookup
//! - [`DetailCache`]: key-value store of encoded member records
//!
//! # Architecture
//!
//! ```text
//! EdgeStore
//! ├── SqliteEdgeStore (graph.db, edges + graph_metadata)
//! └── MemoryEdgeStore (tests, substitution)
//!
//! DetailCache
//! ├── SqliteDetailCache (details.db, members + cache_metadata)
//! └── MemoryDetailCache (tests, substitution)
//! ```
//!
//! Both stores are shared as `Arc<dyn ...>` and must tolerate concurrent
//! callers.

pub mod details;
pub mod graph;
pub mod memory;
pub mod schema;

use std::collections::HashSet;

use tracing::warn;

use crate::error::{CacheError, StoreError};
use crate::model::{Edge, Member};

pub use details::SqliteDetailCache;
pub use graph::SqliteEdgeStore;
pub use memory::{MemoryDetailCache, MemoryEdgeStore};

/// Append-only directed labeled graph.
pub trait EdgeStore: Send + Sync {
    /// Append one edge. Visible to every later read from this process.
    fn add_edge(&self, subject: &str, predicate: &str, object: &str) -> Result<(), StoreError>;

    /// Append a batch of edges.
    ///
    /// Implementations that can write atomically should: either every edge
    /// of the batch is stored or none is.
    fn add_edges(&self, edges: &[Edge]) -> Result<(), StoreError> {
        for edge in edges {
            self.add_edge(&edge.subject, &edge.predicate, &edge.object)?;
        }
        Ok(())
    }

    /// All subjects `s` with an edge `(s, predicate, object)`.
    fn reverse_neighbors(&self, object: &str, predicate: &str)
        -> Result<HashSet<String>, StoreError>;

    /// Every stored edge in storage order. Diagnostic use only.
    fn all_edges(&self) -> Result<Vec<Edge>, StoreError>;

    /// Distinct objects with at least one edge labeled `predicate`, sorted.
    fn objects(&self, predicate: &str) -> Result<Vec<String>, StoreError>;

    /// Number of stored edges, duplicates included.
    fn edge_count(&self) -> Result<usize, StoreError>;
}

/// Raw cache entry: key and encoded value.
pub type CacheEntry = (String, Vec<u8>);

/// Key-value store of encoded member records.
pub trait DetailCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Fetch the raw value for `key`, or [`CacheError::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Lazily iterate over every stored entry.
    fn entries(&self) -> Box<dyn Iterator<Item = Result<CacheEntry, StoreError>> + '_>;

    /// Number of stored records.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Fetch and decode the member stored under `key`.
    fn get_member(&self, key: &str) -> Result<Member, CacheError> {
        let bytes = self.get(key)?;
        Ok(Member::decode(&bytes)?)
    }

    /// Encode and store `member` under its canonical key.
    fn put_member(&self, member: &Member) -> Result<(), CacheError> {
        let bytes = member.encode()?;
        self.set(&member.key(), &bytes)?;
        Ok(())
    }

    /// Lazily decode every stored member, skipping records that fail to decode.
    fn scan_all(&self) -> MemberScan<'_> {
        MemberScan {
            entries: self.entries(),
            skipped: 0,
        }
    }
}

/// Iterator returned by [`DetailCache::scan_all`].
///
/// Undecodable records are logged and skipped. Storage failures are yielded
/// as errors.
pub struct MemberScan<'a> {
    entries: Box<dyn Iterator<Item = Result<CacheEntry, StoreError>> + 'a>,
    skipped: usize,
}

impl MemberScan<'_> {
    /// Number of records skipped so far because they failed to decode.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for MemberScan<'_> {
    type Item = Result<Member, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, bytes) = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };

            match Member::decode(&bytes) {
                Ok(member) => return Some(Ok(member)),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping undecodable member record");
                    self.skipped += 1;
                }
            }
        }
    }
}
