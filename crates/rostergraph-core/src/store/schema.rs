//! SQLite Schema Definitions
//!
//! The relationship graph and the member detail cache live in two independent
//! SQLite databases, each carrying its own schema version.

/// Schema version for the graph database
pub const GRAPH_SCHEMA_VERSION: &str = "1.0";

/// Schema version for the detail cache database
pub const CACHE_SCHEMA_VERSION: &str = "1.0";

/// SQL to create the edges table
///
/// Append-only, no uniqueness constraint. Re-crawling a group stores duplicate
/// rows; reverse-adjacency reads collapse them.
pub const SCHEMA_CREATE_EDGES: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    -- Insertion order
    id INTEGER PRIMARY KEY AUTOINCREMENT,

    subject TEXT NOT NULL,
    predicate TEXT NOT NULL,
    object TEXT NOT NULL
)
"#;

/// SQL to create indexes for the graph database
pub const SCHEMA_CREATE_EDGE_INDEXES: &str = r#"
-- Reverse adjacency: who points at this object under this predicate
CREATE INDEX IF NOT EXISTS idx_edges_object_predicate ON edges(object, predicate);

-- Distinct objects per predicate (group listing)
CREATE INDEX IF NOT EXISTS idx_edges_predicate_object ON edges(predicate, object);
"#;

/// SQL to create the graph metadata table
pub const SCHEMA_CREATE_GRAPH_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS graph_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// SQL to create the member records table
///
/// `key` is the canonical decimal member id, `value` the encoded member record.
pub const SCHEMA_CREATE_MEMBERS: &str = r#"
CREATE TABLE IF NOT EXISTS members (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
)
"#;

/// SQL to create the cache metadata table
pub const SCHEMA_CREATE_CACHE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;
