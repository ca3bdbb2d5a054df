//! Roster API HTTP client
//!
//! [`HttpRosterApi`] implements [`RosterApi`] against the group roster API.
//!
//! # Endpoint Format
//!
//! - GET `{base_url}members?group_urlname={group}&page={page_size}&key={api_key}`
//! - Response: `{"meta": {"next": "...", "total_count": n, "count": n}, "results": [...]}`
//! - GET `{base_url}member/{id}?sign=true&photo-host=public&page=20`
//! - Response: a single member object
//!
//! `next` URLs are absolute and followed verbatim.
//!
//! # Example
//!
//! ```ignore
//! use rostergraph_client::{ClientConfig, HttpRosterApi};
//!
//! let api = HttpRosterApi::new(ClientConfig::new("secret"))?;
//! let page = api.fetch_roster_page(&PageCursor::start("rust-london", 200)).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use rostergraph_core::{Member, PageCursor, RemoteError, RosterApi, RosterPage};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.meetup.com/2/";

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpRosterApi`]
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the API; a trailing `/` is added when missing
    pub base_url: String,
    /// API key sent with roster requests
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Roster API over HTTP.
#[derive(Clone)]
pub struct HttpRosterApi {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpRosterApi {
    /// Create a new client. Fails if the base URL does not parse.
    pub fn new(config: ClientConfig) -> Result<Self, RemoteError> {
        let base = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base_url =
            Url::parse(&base).map_err(|e| RemoteError::request_build(&config.base_url, e))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemoteError::request_build(&config.base_url, e))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// URL of the first roster page of `group`.
    pub fn roster_url(&self, group: &str, page_size: u32) -> Result<Url, RemoteError> {
        let mut url = self
            .base_url
            .join("members")
            .map_err(|e| RemoteError::request_build(self.base_url.as_str(), e))?;
        url.query_pairs_mut()
            .append_pair("group_urlname", group)
            .append_pair("page", &page_size.to_string())
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    /// URL of the detail record of `member_id`.
    pub fn member_url(&self, member_id: &str) -> Result<Url, RemoteError> {
        let mut url = self
            .base_url
            .join(&format!("member/{}", member_id))
            .map_err(|e| RemoteError::request_build(self.base_url.as_str(), e))?;
        url.query_pairs_mut()
            .append_pair("sign", "true")
            .append_pair("photo-host", "public")
            .append_pair("page", "20");
        Ok(url)
    }

    /// `url` without its `key` parameter, for logs and errors.
    fn display_url(url: &Url) -> String {
        let mut shown = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "key")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if pairs.is_empty() {
            shown.set_query(None);
        } else {
            shown.query_pairs_mut().clear().extend_pairs(pairs);
        }
        shown.to_string()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let shown = Self::display_url(&url);
        debug!(url = %shown, "GET");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::transport(&shown, "request timed out")
            } else if e.is_builder() {
                RemoteError::request_build(&shown, e.without_url())
            } else {
                RemoteError::transport(&shown, e.without_url())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::status(status.as_u16(), shown));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(&shown, e.without_url()))?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::decode(shown, e))
    }
}

impl std::fmt::Debug for HttpRosterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRosterApi")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[async_trait]
impl RosterApi for HttpRosterApi {
    async fn fetch_roster_page(&self, cursor: &PageCursor) -> Result<RosterPage, RemoteError> {
        let url = match cursor {
            PageCursor::Start { group, page_size } => self.roster_url(group, *page_size)?,
            PageCursor::Next(next) => {
                Url::parse(next).map_err(|e| RemoteError::request_build(next.as_str(), e))?
            }
        };
        self.get_json(url).await
    }

    async fn fetch_member(&self, member_id: &str) -> Result<Member, RemoteError> {
        let url = self.member_url(member_id)?;
        self.get_json(url).await
    }
}
