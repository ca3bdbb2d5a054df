//! Error types for rostergraph-core.
//!
//! Each stage of the pipeline has its own error enum so callers can apply the
//! propagation policy that fits: storage errors always bubble up, a cache miss
//! is a signal rather than a failure, and remote errors are fatal only when no
//! partial result exists.

use thiserror::Error;

/// Failure of an underlying store (graph or detail cache).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored or fetched member record could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty member record")]
    Empty,

    #[error("unsupported member record version {0}")]
    UnsupportedVersion(u8),

    #[error("malformed member record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by a [`DetailCache`](crate::store::DetailCache).
#[derive(Debug, Error)]
pub enum CacheError {
    /// No value stored under the key. Not a failure for read-through callers.
    #[error("member '{0}' not found in cache")]
    NotFound(String),

    #[error("cache storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("cache record could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

impl CacheError {
    /// Whether this error is a plain cache miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StoreError::Sqlite(err))
    }
}

/// Errors talking to the remote roster API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request could not be built (bad base URL, bad cursor URL).
    #[error("failed to build request for '{url}': {message}")]
    RequestBuild { url: String, message: String },

    /// Network or connection failure, including timeouts.
    #[error("request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    /// The API answered with a non-success status.
    #[error("API returned status {status} for '{url}'")]
    Status { status: u16, url: String },

    /// The response body was not the expected JSON.
    #[error("failed to decode response from '{url}': {message}")]
    Decode { url: String, message: String },
}

impl RemoteError {
    pub fn request_build(url: impl Into<String>, message: impl ToString) -> Self {
        Self::RequestBuild {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// Errors that abort a roster crawl outright.
///
/// Failures after the first page are not errors; they end the crawl early and
/// are reported through [`CrawlStop`](crate::crawler::CrawlStop).
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to fetch first roster page for group '{group}': {source}")]
    FirstPage {
        group: String,
        #[source]
        source: RemoteError,
    },

    #[error("crawl of group '{0}' cancelled before the first page")]
    Cancelled(String),
}

/// Errors resolving a single member.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid member id '{0}'")]
    InvalidMemberId(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to fetch member details: {0}")]
    Remote(#[from] RemoteError),
}

/// Errors running an intersection query.
#[derive(Debug, Error)]
pub enum IntersectError {
    #[error("graph storage failed: {0}")]
    Storage(#[from] StoreError),
}

/// Errors surfaced by [`RosterService`](crate::service::RosterService).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Intersect(#[from] IntersectError),
}
