//! Remote roster API interface.
//!
//! The crawler and resolver only see this trait. The HTTP implementation lives
//! in `rostergraph-client`; tests substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::model::{null_as_default, Member};

/// Where to read the next roster page from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// First page of a group's roster.
    Start { group: String, page_size: u32 },
    /// Absolute URL taken from the previous page's `meta.next`.
    Next(String),
}

impl PageCursor {
    pub fn start(group: impl Into<String>, page_size: u32) -> Self {
        Self::Start {
            group: group.into(),
            page_size,
        }
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start { group, page_size } => write!(f, "{} (page size {})", group, page_size),
            Self::Next(url) => write!(f, "{}", url),
        }
    }
}

/// Pagination metadata of a roster page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterMeta {
    /// URL of the next page; empty on the last page
    #[serde(deserialize_with = "null_as_default")]
    pub next: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
}

/// One page of a group's roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterPage {
    #[serde(deserialize_with = "null_as_default")]
    pub meta: RosterMeta,
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<Member>,
}

impl RosterPage {
    /// Cursor for the following page, if any.
    pub fn next_cursor(&self) -> Option<PageCursor> {
        let next = self.meta.next.trim();
        if next.is_empty() {
            None
        } else {
            Some(PageCursor::Next(next.to_string()))
        }
    }
}

/// Remote source of rosters and member details.
#[async_trait]
pub trait RosterApi: Send + Sync {
    /// Fetch a single roster page.
    async fn fetch_roster_page(&self, cursor: &PageCursor) -> Result<RosterPage, RemoteError>;

    /// Fetch full details for one member, by canonical id.
    async fn fetch_member(&self, member_id: &str) -> Result<Member, RemoteError>;
}
