//! SQLite-backed member detail cache.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use tracing::{debug, trace};

use super::schema::{CACHE_SCHEMA_VERSION, SCHEMA_CREATE_CACHE_METADATA, SCHEMA_CREATE_MEMBERS};
use super::{CacheEntry, DetailCache};
use crate::error::{CacheError, StoreError};

/// Rows fetched per round-trip while scanning.
const SCAN_BATCH_SIZE: usize = 256;

/// Member detail cache in a SQLite database.
///
/// Writes go through `INSERT OR REPLACE`, so concurrent writers to the same key
/// resolve to last-writer-wins.
pub struct SqliteDetailCache {
    conn: Mutex<Connection>,
}

impl SqliteDetailCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn)
    }

    /// Create an in-memory cache (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA_CREATE_MEMBERS, [])?;
        conn.execute(SCHEMA_CREATE_CACHE_METADATA, [])?;

        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match version {
            None => {
                conn.execute(
                    "INSERT INTO cache_metadata (key, value) VALUES ('schema_version', ?1)",
                    [CACHE_SCHEMA_VERSION],
                )?;
            }
            Some(v) if v == CACHE_SCHEMA_VERSION => {}
            Some(found) => {
                return Err(StoreError::SchemaVersionMismatch {
                    expected: CACHE_SCHEMA_VERSION.to_string(),
                    found,
                });
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fetch the next batch of rows after `after_rowid`.
    fn batch_after(&self, after_rowid: i64) -> Result<Vec<(i64, CacheEntry)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT rowid, key, value FROM members WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
        )?;
        let rows: Vec<(i64, CacheEntry)> = stmt
            .query_map(params![after_rowid, SCAN_BATCH_SIZE as i64], |row| {
                Ok((row.get(0)?, (row.get(1)?, row.get(2)?)))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

impl DetailCache for SqliteDetailCache {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO members (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        trace!(key, bytes = value.len(), "member record stored");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let conn = self.conn.lock();
        let value: Option<Vec<u8>> = conn
            .query_row("SELECT value FROM members WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Result<CacheEntry, StoreError>> + '_> {
        Box::new(BatchedEntries {
            cache: self,
            last_rowid: 0,
            buffer: Vec::new().into_iter(),
            done: false,
        })
    }

    fn len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Pages through the members table by rowid, releasing the connection lock
/// between batches.
struct BatchedEntries<'a> {
    cache: &'a SqliteDetailCache,
    last_rowid: i64,
    buffer: std::vec::IntoIter<(i64, CacheEntry)>,
    done: bool,
}

impl Iterator for BatchedEntries<'_> {
    type Item = Result<CacheEntry, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((rowid, entry)) = self.buffer.next() {
                self.last_rowid = rowid;
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }

            match self.cache.batch_after(self.last_rowid) {
                Ok(rows) => {
                    debug!(after = self.last_rowid, rows = rows.len(), "scanned cache batch");
                    if rows.len() < SCAN_BATCH_SIZE {
                        self.done = true;
                    }
                    self.buffer = rows.into_iter();
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
