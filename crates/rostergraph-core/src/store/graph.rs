//! SQLite-backed relationship graph.
//!
//! Edges are appended to a single `edges` table. Reverse adjacency is served by
//! the `(object, predicate)` index.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use tracing::{debug, error};

use super::schema::{
    GRAPH_SCHEMA_VERSION, SCHEMA_CREATE_EDGES, SCHEMA_CREATE_EDGE_INDEXES,
    SCHEMA_CREATE_GRAPH_METADATA,
};
use super::EdgeStore;
use crate::error::StoreError;
use crate::model::Edge;

/// Append-only edge store in a SQLite database.
///
/// The connection is guarded by a mutex, so concurrent writers are serialised
/// and never interleave partial rows.
pub struct SqliteEdgeStore {
    conn: Mutex<Connection>,
}

impl SqliteEdgeStore {
    /// Open (or create) the graph database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        Self::init(conn)
    }

    /// Create an in-memory graph (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(SCHEMA_CREATE_EDGES, [])?;
        conn.execute(SCHEMA_CREATE_GRAPH_METADATA, [])?;
        conn.execute_batch(SCHEMA_CREATE_EDGE_INDEXES)?;

        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM graph_metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match version {
            None => {
                conn.execute(
                    "INSERT INTO graph_metadata (key, value) VALUES ('schema_version', ?1)",
                    [GRAPH_SCHEMA_VERSION],
                )?;
            }
            Some(v) if v == GRAPH_SCHEMA_VERSION => {}
            Some(found) => {
                return Err(StoreError::SchemaVersionMismatch {
                    expected: GRAPH_SCHEMA_VERSION.to_string(),
                    found,
                });
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure_connection(conn: &Connection) -> SqliteResult<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(())
    }
}

impl EdgeStore for SqliteEdgeStore {
    fn add_edge(&self, subject: &str, predicate: &str, object: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO edges (subject, predicate, object) VALUES (?1, ?2, ?3)",
            params![subject, predicate, object],
        )
        .map_err(|e| {
            error!(subject, predicate, object, error = %e, "failed to add edge");
            e
        })?;
        debug!(subject, predicate, object, "edge added");
        Ok(())
    }

    fn add_edges(&self, edges: &[Edge]) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO edges (subject, predicate, object) VALUES (?1, ?2, ?3)")?;
            for edge in edges {
                stmt.execute(params![edge.subject, edge.predicate, edge.object])?;
            }
        }
        tx.commit()?;
        debug!(count = edges.len(), "edges added");
        Ok(())
    }

    fn reverse_neighbors(
        &self,
        object: &str,
        predicate: &str,
    ) -> Result<HashSet<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT subject FROM edges WHERE object = ?1 AND predicate = ?2")?;
        let subjects = stmt
            .query_map(params![object, predicate], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<HashSet<_>>>()?;
        Ok(subjects)
    }

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT subject, predicate, object FROM edges ORDER BY id")?;
        let edges = stmt
            .query_map([], |row| {
                Ok(Edge {
                    subject: row.get(0)?,
                    predicate: row.get(1)?,
                    object: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(edges)
    }

    fn objects(&self, predicate: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT object FROM edges WHERE predicate = ?1 ORDER BY object",
        )?;
        let objects = stmt
            .query_map([predicate], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(objects)
    }

    fn edge_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FOLLOWS;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reverse_neighbors_filters_object_and_predicate() {
        let store = SqliteEdgeStore::in_memory().unwrap();
        store.add_edge("1", FOLLOWS, "A").unwrap();
        store.add_edge("2", FOLLOWS, "A").unwrap();
        store.add_edge("3", "organises", "A").unwrap();
        store.add_edge("1", FOLLOWS, "B").unwrap();

        assert_eq!(store.reverse_neighbors("A", FOLLOWS).unwrap(), set(&["1", "2"]));
        assert_eq!(store.reverse_neighbors("B", FOLLOWS).unwrap(), set(&["1"]));
        assert!(store.reverse_neighbors("C", FOLLOWS).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_edges_are_stored_but_collapse_on_read() {
        let store = SqliteEdgeStore::in_memory().unwrap();
        store.add_edge("1", FOLLOWS, "A").unwrap();
        store.add_edge("1", FOLLOWS, "A").unwrap();

        assert_eq!(store.edge_count().unwrap(), 2);
        assert_eq!(store.reverse_neighbors("A", FOLLOWS).unwrap(), set(&["1"]));
    }

    #[test]
    fn test_all_edges_in_insertion_order() {
        let store = SqliteEdgeStore::in_memory().unwrap();
        let edges = vec![
            Edge::new("2", FOLLOWS, "B"),
            Edge::new("1", FOLLOWS, "A"),
            Edge::new("3", FOLLOWS, "A"),
        ];
        store.add_edges(&edges).unwrap();

        assert_eq!(store.all_edges().unwrap(), edges);
    }

    #[test]
    fn test_objects_are_distinct_and_sorted() {
        let store = SqliteEdgeStore::in_memory().unwrap();
        store.add_edge("1", FOLLOWS, "rust-london").unwrap();
        store.add_edge("2", FOLLOWS, "docker-london").unwrap();
        store.add_edge("3", FOLLOWS, "rust-london").unwrap();
        store.add_edge("3", "organises", "go-london").unwrap();

        assert_eq!(
            store.objects(FOLLOWS).unwrap(),
            vec!["docker-london".to_string(), "rust-london".to_string()]
        );
    }

    #[test]
    fn test_edges_persist_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("graph.db");

        {
            let store = SqliteEdgeStore::open(&path).unwrap();
            store.add_edge("1", FOLLOWS, "A").unwrap();
        }

        let store = SqliteEdgeStore::open(&path).unwrap();
        assert_eq!(store.reverse_neighbors("A", FOLLOWS).unwrap(), set(&["1"]));
    }

    #[test]
    fn test_schema_version_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("graph.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(SCHEMA_CREATE_GRAPH_METADATA, []).unwrap();
            conn.execute(
                "INSERT INTO graph_metadata (key, value) VALUES ('schema_version', '9.9')",
                [],
            )
            .unwrap();
        }

        match SqliteEdgeStore::open(&path) {
            Err(StoreError::SchemaVersionMismatch { expected, found }) => {
                assert_eq!(expected, GRAPH_SCHEMA_VERSION);
                assert_eq!(found, "9.9");
            }
            other => panic!("expected schema mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_concurrent_writers() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteEdgeStore::open(&temp.path().join("graph.db")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .add_edge(&format!("{}", t * 100 + i), FOLLOWS, "A")
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.edge_count().unwrap(), 100);
        assert_eq!(store.reverse_neighbors("A", FOLLOWS).unwrap().len(), 100);
    }
}
