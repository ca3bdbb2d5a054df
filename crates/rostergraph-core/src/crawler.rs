//! Remote Roster Crawler
//!
//! Walks a group's paginated roster until the `next` cursor runs out, the page
//! limit is hit, the crawl is cancelled, or a later page fails.
//!
//! Failure policy:
//! - first page fails: the crawl fails ([`CrawlError::FirstPage`])
//! - a later page fails: members gathered so far are returned and the failure
//!   is reported in [`CrawlOutcome::stop`]

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::CrawlError;
use crate::model::Member;
use crate::remote::{PageCursor, RosterApi};

/// Default members requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Default upper bound on pages followed per crawl
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Crawl settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    pub page_size: u32,
    pub max_pages: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl CrawlOptions {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// Why a crawl ended before the roster was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStop {
    /// Page number `page` (1-based) failed; earlier pages were kept.
    PageFailed { page: usize, error: String },
    /// A `next` cursor was still present after `limit` pages.
    PageLimitExceeded { limit: usize },
    /// Cancelled after `after_pages` pages.
    Cancelled { after_pages: usize },
}

impl std::fmt::Display for CrawlStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PageFailed { page, error } => write!(f, "page {} failed: {}", page, error),
            Self::PageLimitExceeded { limit } => {
                write!(f, "pagination limit of {} pages exceeded", limit)
            }
            Self::Cancelled { after_pages } => write!(f, "cancelled after {} pages", after_pages),
        }
    }
}

/// Result of a crawl that fetched at least its first page.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOutcome {
    /// Members in roster order, deduplicated by id
    pub members: Vec<Member>,
    /// Number of pages fetched successfully
    pub pages: usize,
    /// `None` when the roster was read to the end
    pub stop: Option<CrawlStop>,
}

impl CrawlOutcome {
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }
}

/// Turns a paginated roster endpoint into a complete member list.
pub struct RosterCrawler {
    api: Arc<dyn RosterApi>,
    options: CrawlOptions,
}

impl RosterCrawler {
    pub fn new(api: Arc<dyn RosterApi>) -> Self {
        Self::with_options(api, CrawlOptions::default())
    }

    pub fn with_options(api: Arc<dyn RosterApi>, options: CrawlOptions) -> Self {
        Self { api, options }
    }

    pub fn options(&self) -> CrawlOptions {
        self.options
    }

    /// Fetch every member of `group` with the configured page size.
    pub async fn crawl(
        &self,
        group: &str,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, CrawlError> {
        self.fetch_group_members(group, self.options.page_size, cancel)
            .await
    }

    /// Fetch every member of `group`, `page_size` members per request.
    pub async fn fetch_group_members(
        &self,
        group: &str,
        page_size: u32,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, CrawlError> {
        if cancel.is_cancelled() {
            return Err(CrawlError::Cancelled(group.to_string()));
        }

        let first = PageCursor::start(group, page_size);
        let page = self
            .api
            .fetch_roster_page(&first)
            .await
            .map_err(|source| {
                error!(group, error = %source, "failed to fetch first roster page");
                CrawlError::FirstPage {
                    group: group.to_string(),
                    source,
                }
            })?;

        let mut seen = HashSet::new();
        let mut members = Vec::new();
        let mut pages = 1;
        let mut next = page.next_cursor();
        extend_unique(&mut members, &mut seen, page.results);
        debug!(group, page = pages, collected = members.len(), "roster page fetched");

        let mut stop = None;
        while let Some(cursor) = next.take() {
            if pages >= self.options.max_pages {
                warn!(group, limit = self.options.max_pages, "pagination limit exceeded");
                stop = Some(CrawlStop::PageLimitExceeded {
                    limit: self.options.max_pages,
                });
                break;
            }

            if cancel.is_cancelled() {
                info!(group, pages, "roster crawl cancelled");
                stop = Some(CrawlStop::Cancelled { after_pages: pages });
                break;
            }

            match self.api.fetch_roster_page(&cursor).await {
                Ok(page) => {
                    pages += 1;
                    next = page.next_cursor();
                    extend_unique(&mut members, &mut seen, page.results);
                    debug!(group, page = pages, collected = members.len(), "roster page fetched");
                }
                Err(e) => {
                    error!(
                        group,
                        url = %cursor,
                        page = pages + 1,
                        error = %e,
                        "failed to follow trail of members"
                    );
                    stop = Some(CrawlStop::PageFailed {
                        page: pages + 1,
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        info!(group, pages, members = members.len(), "roster crawl finished");
        Ok(CrawlOutcome {
            members,
            pages,
            stop,
        })
    }
}

fn extend_unique(members: &mut Vec<Member>, seen: &mut HashSet<i64>, batch: Vec<Member>) {
    for member in batch {
        if seen.insert(member.id) {
            members.push(member);
        }
    }
}
