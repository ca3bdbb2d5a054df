//! Shared fakes for rostergraph-core integration tests.
//!
//! - [`ScriptedApi`]: a [`RosterApi`] answering from a fixed script of pages
//!   and member records, counting every call
//! - [`FlakyCache`]: a [`DetailCache`] over memory whose writes can be made
//!   to fail
//! - [`CountingGraph`]: an [`EdgeStore`] over memory counting adjacency reads

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use rostergraph_core::store::CacheEntry;
use rostergraph_core::{
    CacheError, DetailCache, Edge, EdgeStore, Member, MemoryDetailCache, MemoryEdgeStore,
    PageCursor, RemoteError, RosterApi, RosterMeta, RosterPage, StoreError,
};

pub const BASE: &str = "https://roster.test/2/";

/// URL used as the `next` cursor of page `n` (n >= 2).
pub fn page_url(group: &str, n: usize) -> String {
    format!("{}members?group_urlname={}&offset={}", BASE, group, n - 1)
}

/// Build a roster page holding members `ids`, linking to `next`.
pub fn roster_page(ids: &[i64], next: Option<String>) -> RosterPage {
    RosterPage {
        meta: RosterMeta {
            next: next.unwrap_or_default(),
            total_count: 0,
            count: ids.len() as u64,
        },
        results: ids
            .iter()
            .map(|id| Member::new(*id, format!("member-{}", id)))
            .collect(),
    }
}

enum Scripted {
    Page(RosterPage),
    Fail(String),
}

fn cursor_key(cursor: &PageCursor) -> String {
    match cursor {
        PageCursor::Start { group, .. } => format!("start:{}", group),
        PageCursor::Next(url) => url.clone(),
    }
}

/// Remote API answering from a script.
#[derive(Default)]
pub struct ScriptedApi {
    pages: Mutex<HashMap<String, Scripted>>,
    members: Mutex<HashMap<String, Member>>,
    failing_members: Mutex<HashMap<String, String>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    page_calls: AtomicUsize,
    member_calls: AtomicUsize,
    seen_page_sizes: Mutex<Vec<u32>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a roster of `pages` for `group`, chained by `next` cursors.
    pub fn with_roster(self, group: &str, pages: &[&[i64]]) -> Self {
        for (i, ids) in pages.iter().enumerate() {
            let next = (i + 1 < pages.len()).then(|| page_url(group, i + 2));
            let key = if i == 0 {
                format!("start:{}", group)
            } else {
                page_url(group, i + 1)
            };
            self.pages
                .lock()
                .insert(key, Scripted::Page(roster_page(ids, next)));
        }
        self
    }

    /// Script an endless roster: every page links to itself.
    pub fn with_endless_roster(self, group: &str) -> Self {
        let url = page_url(group, 2);
        self.pages.lock().insert(
            format!("start:{}", group),
            Scripted::Page(roster_page(&[1], Some(url.clone()))),
        );
        self.pages
            .lock()
            .insert(url.clone(), Scripted::Page(roster_page(&[2], Some(url))));
        self
    }

    /// Make page `n` (1-based) of `group` fail with a transport error.
    pub fn failing_page(self, group: &str, n: usize) -> Self {
        let key = if n == 1 {
            format!("start:{}", group)
        } else {
            page_url(group, n)
        };
        self.pages
            .lock()
            .insert(key, Scripted::Fail("connection reset".into()));
        self
    }

    pub fn with_member(self, member: Member) -> Self {
        self.members.lock().insert(member.key(), member);
        self
    }

    pub fn failing_member(self, id: i64) -> Self {
        self.failing_members
            .lock()
            .insert(id.to_string(), "member endpoint down".into());
        self
    }

    /// Cancel `token` once `pages` roster pages have been served.
    pub fn cancel_after_pages(self, pages: usize, token: CancellationToken) -> Self {
        *self.cancel_after.lock() = Some((pages, token));
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }

    pub fn seen_page_sizes(&self) -> Vec<u32> {
        self.seen_page_sizes.lock().clone()
    }
}

#[async_trait]
impl RosterApi for ScriptedApi {
    async fn fetch_roster_page(&self, cursor: &PageCursor) -> Result<RosterPage, RemoteError> {
        let served = self.page_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let PageCursor::Start { page_size, .. } = cursor {
            self.seen_page_sizes.lock().push(*page_size);
        }

        if let Some((after, token)) = self.cancel_after.lock().as_ref() {
            if served >= *after {
                token.cancel();
            }
        }

        let key = cursor_key(cursor);
        match self.pages.lock().get(&key) {
            Some(Scripted::Page(page)) => Ok(page.clone()),
            Some(Scripted::Fail(message)) => Err(RemoteError::transport(key, message)),
            None => Err(RemoteError::status(404, key)),
        }
    }

    async fn fetch_member(&self, member_id: &str) -> Result<Member, RemoteError> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failing_members.lock().get(member_id) {
            return Err(RemoteError::transport(member_id, message));
        }
        self.members
            .lock()
            .get(member_id)
            .cloned()
            .ok_or_else(|| RemoteError::status(404, member_id))
    }
}

/// In-memory detail cache that counts writes and can refuse them.
#[derive(Default)]
pub struct FlakyCache {
    inner: MemoryDetailCache,
    fail_writes: AtomicBool,
    sets: AtomicUsize,
}

impl FlakyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

impl DetailCache for FlakyCache {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.set(key, value)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.inner.get(key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Result<CacheEntry, StoreError>> + '_> {
        self.inner.entries()
    }

    fn len(&self) -> Result<usize, StoreError> {
        self.inner.len()
    }
}

/// In-memory graph that counts `reverse_neighbors` calls per object.
#[derive(Default)]
pub struct CountingGraph {
    inner: MemoryEdgeStore,
    reads: Mutex<HashMap<String, usize>>,
}

impl CountingGraph {
    pub fn with_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        Self {
            inner: MemoryEdgeStore::with_edges(edges),
            reads: Mutex::new(HashMap::new()),
        }
    }

    /// Adjacency reads of `object` so far.
    pub fn reads_of(&self, object: &str) -> usize {
        self.reads.lock().get(object).copied().unwrap_or(0)
    }

    /// Adjacency reads across all objects.
    pub fn total_reads(&self) -> usize {
        self.reads.lock().values().sum()
    }
}

impl EdgeStore for CountingGraph {
    fn add_edge(&self, subject: &str, predicate: &str, object: &str) -> Result<(), StoreError> {
        self.inner.add_edge(subject, predicate, object)
    }

    fn reverse_neighbors(
        &self,
        object: &str,
        predicate: &str,
    ) -> Result<HashSet<String>, StoreError> {
        *self.reads.lock().entry(object.to_string()).or_default() += 1;
        self.inner.reverse_neighbors(object, predicate)
    }

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        self.inner.all_edges()
    }

    fn objects(&self, predicate: &str) -> Result<Vec<String>, StoreError> {
        self.inner.objects(predicate)
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        self.inner.edge_count()
    }
}
