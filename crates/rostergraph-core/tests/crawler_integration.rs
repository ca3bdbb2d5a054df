//! Roster crawler integration tests.
//!
//! ```bash
//! cargo test --package rostergraph-core --test crawler_integration
//! ```

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::ScriptedApi;
use rostergraph_core::{CancellationToken, CrawlError, CrawlOptions, CrawlStop, RosterCrawler};

fn ids(outcome: &rostergraph_core::CrawlOutcome) -> Vec<i64> {
    outcome.members.iter().map(|m| m.id).collect()
}

#[tokio::test]
async fn test_three_page_roster_returns_every_member() {
    let api = Arc::new(ScriptedApi::new().with_roster("rust-ldn", &[&[1, 2], &[3, 4], &[5]]));
    let crawler = RosterCrawler::new(api.clone());

    let outcome = crawler
        .fetch_group_members("rust-ldn", 2, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5]);
    assert_eq!(outcome.pages, 3);
    assert!(outcome.is_complete());
    assert_eq!(api.page_calls(), 3);
    assert_eq!(api.seen_page_sizes(), vec![2]);

    let unique: HashSet<i64> = ids(&outcome).into_iter().collect();
    assert_eq!(unique.len(), 5);
}

#[tokio::test]
async fn test_failed_later_page_keeps_earlier_members() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_roster("rust-ldn", &[&[1, 2], &[3, 4], &[5]])
            .failing_page("rust-ldn", 3),
    );
    let crawler = RosterCrawler::new(api);

    let outcome = crawler
        .crawl("rust-ldn", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&outcome), vec![1, 2, 3, 4]);
    assert_eq!(outcome.pages, 2);
    match outcome.stop {
        Some(CrawlStop::PageFailed { page, ref error }) => {
            assert_eq!(page, 3);
            assert!(error.contains("connection reset"));
        }
        other => panic!("expected PageFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_first_page_is_an_error() {
    let api = Arc::new(
        ScriptedApi::new()
            .with_roster("rust-ldn", &[&[1, 2], &[3]])
            .failing_page("rust-ldn", 1),
    );
    let crawler = RosterCrawler::new(api.clone());

    let err = crawler
        .crawl("rust-ldn", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::FirstPage { ref group, .. } if group == "rust-ldn"));
    assert_eq!(api.page_calls(), 1);
}

#[tokio::test]
async fn test_duplicate_members_across_pages_are_collapsed() {
    let api = Arc::new(ScriptedApi::new().with_roster("g", &[&[1, 2], &[2, 3]]));
    let crawler = RosterCrawler::new(api);

    let outcome = crawler.crawl("g", &CancellationToken::new()).await.unwrap();
    assert_eq!(ids(&outcome), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_endless_cursor_hits_page_limit() {
    let api = Arc::new(ScriptedApi::new().with_endless_roster("loop"));
    let crawler =
        RosterCrawler::with_options(api.clone(), CrawlOptions::default().with_max_pages(5));

    let outcome = crawler.crawl("loop", &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.pages, 5);
    assert_eq!(api.page_calls(), 5);
    assert_eq!(outcome.stop, Some(CrawlStop::PageLimitExceeded { limit: 5 }));
    assert_eq!(ids(&outcome), vec![1, 2]);
}

#[tokio::test]
async fn test_cancellation_between_pages() {
    let token = CancellationToken::new();
    let api = Arc::new(
        ScriptedApi::new()
            .with_roster("g", &[&[1], &[2], &[3]])
            .cancel_after_pages(1, token.clone()),
    );
    let crawler = RosterCrawler::new(api.clone());

    let outcome = crawler.crawl("g", &token).await.unwrap();

    assert_eq!(ids(&outcome), vec![1]);
    assert_eq!(outcome.stop, Some(CrawlStop::Cancelled { after_pages: 1 }));
    assert_eq!(api.page_calls(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_fetches_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let api = Arc::new(ScriptedApi::new().with_roster("g", &[&[1]]));
    let crawler = RosterCrawler::new(api.clone());

    let err = crawler.crawl("g", &token).await.unwrap_err();
    assert!(matches!(err, CrawlError::Cancelled(_)));
    assert_eq!(api.page_calls(), 0);
}
