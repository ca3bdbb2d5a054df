//! In-memory store implementations.
//!
//! Drop-in substitutes for the SQLite stores, used by tests and by callers
//! that do not need durability.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;

use super::{CacheEntry, DetailCache, EdgeStore};
use crate::error::{CacheError, StoreError};
use crate::model::Edge;

#[derive(Debug, Default)]
struct MemoryGraph {
    /// Edges in insertion order
    edges: Vec<Edge>,
    /// (object, predicate) -> subjects, the reverse adjacency index
    by_target: HashMap<(String, String), HashSet<String>>,
}

/// Append-only edge store held in memory.
#[derive(Debug, Default)]
pub struct MemoryEdgeStore {
    inner: RwLock<MemoryGraph>,
}

impl MemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `edges`.
    pub fn with_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        let store = Self::new();
        {
            let mut graph = store.inner.write();
            for edge in edges {
                graph.push(edge);
            }
        }
        store
    }
}

impl MemoryGraph {
    fn push(&mut self, edge: Edge) {
        self.by_target
            .entry((edge.object.clone(), edge.predicate.clone()))
            .or_default()
            .insert(edge.subject.clone());
        self.edges.push(edge);
    }
}

impl EdgeStore for MemoryEdgeStore {
    fn add_edge(&self, subject: &str, predicate: &str, object: &str) -> Result<(), StoreError> {
        self.inner.write().push(Edge::new(subject, predicate, object));
        Ok(())
    }

    fn add_edges(&self, edges: &[Edge]) -> Result<(), StoreError> {
        let mut graph = self.inner.write();
        for edge in edges {
            graph.push(edge.clone());
        }
        Ok(())
    }

    fn reverse_neighbors(
        &self,
        object: &str,
        predicate: &str,
    ) -> Result<HashSet<String>, StoreError> {
        let graph = self.inner.read();
        Ok(graph
            .by_target
            .get(&(object.to_string(), predicate.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        Ok(self.inner.read().edges.clone())
    }

    fn objects(&self, predicate: &str) -> Result<Vec<String>, StoreError> {
        let graph = self.inner.read();
        let objects: BTreeSet<&String> = graph
            .by_target
            .keys()
            .filter(|(_, p)| p == predicate)
            .map(|(object, _)| object)
            .collect();
        Ok(objects.into_iter().cloned().collect())
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().edges.len())
    }
}

/// Detail cache held in memory, iterated in key order.
#[derive(Debug, Default)]
pub struct MemoryDetailCache {
    records: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryDetailCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetailCache for MemoryDetailCache {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Result<CacheEntry, StoreError>> + '_> {
        // Snapshot so the lock is not held while the caller iterates
        let snapshot: Vec<CacheEntry> = self
            .records
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Box::new(snapshot.into_iter().map(Ok))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().len())
    }
}
