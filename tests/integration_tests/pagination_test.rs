//! Pagination integration tests
//!
//! Limit, date cutoff, deduplication and progress reporting across pages
//! served by a scripted transport.

use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ytmeta::comment::CommentQuery;
use ytmeta::models::SortOrder;
use ytmeta::utils::error::CommentError;

use crate::common::*;

const TOP: &str = "TOP-TOKEN-0000000001";
const RECENT: &str = "RECENT-TOKEN-00000001";

fn menu_stub() -> StubTransport {
    StubTransport::new().with_initial_data(initial_data_with_menu(TOP, RECENT))
}

/// Page of comments published 1..=n days ago, newest first
fn dated_page(n: usize, next: Option<&str>) -> Value {
    let ids = ids("day", 1, n);
    let mut items: Vec<Value> = ids.iter().map(|id| view_model_thread(id)).collect();
    if let Some(token) = next {
        items.push(next_item(token));
    }
    let mutations = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let published = match i + 1 {
                1 => "1 day ago".to_string(),
                days => format!("{days} days ago"),
            };
            entity_mutation(id, "dated", &published, "1")
        })
        .collect();
    page(items, mutations)
}

// ============================================================================
// Limit
// ============================================================================

#[tokio::test]
async fn test_limit_stops_mid_page_without_next_request() {
    let stub = menu_stub().with_page(
        TOP,
        comments_page(&ids("c", 0, 20), "1 week ago", Some("PAGE-2")),
    );
    let (fetcher, stub) = engine(stub);

    let stream = fetcher
        .fetch_comments(VIDEO_ID, CommentQuery::new().limit(5))
        .unwrap();
    let (records, error) = drain(stream).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 5);
    let got: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(got, vec!["c0", "c1", "c2", "c3", "c4"]);
    assert_eq!(stub.requested_tokens(), vec![TOP.to_string()]);
}

#[tokio::test]
async fn test_follows_chain_until_exhausted() {
    let stub = menu_stub()
        .with_page(TOP, comments_page(&ids("a", 0, 3), "1 week ago", Some("PAGE-2")))
        .with_page("PAGE-2", comments_page(&ids("a", 3, 3), "1 week ago", Some("PAGE-3")))
        .with_page("PAGE-3", comments_page(&ids("a", 6, 2), "1 week ago", None));
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 8);
    assert_eq!(stub.requested_tokens(), vec![TOP, "PAGE-2", "PAGE-3"]);
    assert_eq!(stub.watch_page_requests(), 1);
}

// ============================================================================
// Deduplication
// ============================================================================

#[tokio::test]
async fn test_overlapping_pages_are_deduplicated() {
    let stub = menu_stub()
        .with_page(TOP, comments_page(&ids("c", 0, 10), "2 days ago", Some("PAGE-2")))
        .with_page("PAGE-2", comments_page(&ids("c", 5, 10), "2 days ago", None));
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 15);
    let unique: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(unique.len(), records.len());
}

#[tokio::test]
async fn test_repeated_token_ends_the_chain() {
    let stub = menu_stub()
        .with_page(TOP, comments_page(&ids("c", 0, 2), "1 day ago", Some("LOOP")))
        .with_page("LOOP", comments_page(&ids("c", 2, 2), "1 day ago", Some("LOOP")));
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 4);
    assert_eq!(stub.requested_tokens(), vec![TOP, "LOOP"]);
}

#[tokio::test]
async fn test_empty_page_with_token_continues() {
    let stub = menu_stub()
        .with_page(TOP, page(vec![next_item("PAGE-2")], vec![]))
        .with_page("PAGE-2", comments_page(&ids("c", 0, 2), "1 day ago", None));
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 2);
}

// ============================================================================
// Date cutoff
// ============================================================================

#[tokio::test]
async fn test_since_stops_at_first_older_record() {
    let stub = menu_stub().with_page(RECENT, dated_page(10, Some("PAGE-2")));
    let (fetcher, stub) = engine(stub);

    let cutoff = Utc::now().date_naive() - Duration::days(5);
    let query = CommentQuery::new().sort(SortOrder::Recent).since(cutoff);
    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, query).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 5);
    assert!(records
        .iter()
        .all(|r| r.publish_date.is_some_and(|date| date >= cutoff)));
    // the page holding the older record is the last one requested
    assert_eq!(stub.requested_tokens(), vec![RECENT.to_string()]);
}

#[tokio::test]
async fn test_since_with_top_rejected_before_any_request() {
    let (fetcher, stub) = engine(menu_stub());

    let cutoff = Utc::now().date_naive();
    let result = fetcher.fetch_comments(VIDEO_ID, CommentQuery::new().since(cutoff));

    assert!(matches!(result, Err(CommentError::Configuration(_))));
    assert_eq!(stub.watch_page_requests(), 0);
    assert_eq!(stub.continuation_requests(), 0);
}

// ============================================================================
// Record invariants
// ============================================================================

#[tokio::test]
async fn test_reply_records_carry_parent() {
    let items = vec![view_model_thread("p1"), view_model_thread("p2")];
    let mutations = vec![
        entity_mutation("p1", "top", "1 day ago", "3"),
        entity_mutation("p1.r1", "inline reply", "1 day ago", "1"),
        entity_mutation("p2", "top", "1 day ago", "3"),
    ];
    let stub = menu_stub().with_page(TOP, page(items, mutations));
    let (fetcher, _stub) = engine(stub);

    let (records, _) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert_eq!(records.len(), 3);
    for record in &records {
        if record.is_reply {
            assert!(record.parent_id.is_some());
            assert_eq!(record.reply_count, 0);
        } else {
            assert!(record.parent_id.is_none());
        }
    }
    let reply = records.iter().find(|r| r.id == "p1.r1").unwrap();
    assert_eq!(reply.parent_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_fetch_is_idempotent() {
    let build = || {
        menu_stub()
            .with_page(TOP, comments_page(&ids("c", 0, 4), "3 weeks ago", Some("PAGE-2")))
            .with_page("PAGE-2", comments_page(&ids("c", 4, 4), "1 month ago", None))
    };

    let (first, _) = engine(build());
    let (second, _) = engine(build());
    let (a, _) = drain(first.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;
    let (b, _) = drain(second.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert_eq!(a.len(), 8);
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_three_families_merge_into_one_record_each() {
    let items = vec![
        legacy_thread("L1", "legacy only", "7"),
        view_model_thread("V1"),
        legacy_thread("B1", "legacy text", "3"),
    ];
    let mutations = vec![
        entity_mutation("V1", "view model only", "1 day ago", "12"),
        entity_mutation("B1", "entity text", "1 day ago", "1.5K"),
    ];
    let stub = menu_stub().with_page(TOP, page(items, mutations));
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    let got: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(got, vec!["L1", "V1", "B1"]);

    let legacy = &records[0];
    assert_eq!(legacy.text, "legacy only");
    assert_eq!(legacy.like_count, 7);
    assert_eq!(legacy.author_avatar_url, "https://yt3.example/large.jpg");

    let view_model = &records[1];
    assert_eq!(view_model.text, "view model only");
    assert_eq!(view_model.author, "@user-V1");

    let both = &records[2];
    assert_eq!(both.text, "legacy text");
    assert_eq!(both.like_count, 1500);
}

// ============================================================================
// Progress and reply tokens
// ============================================================================

#[tokio::test]
async fn test_progress_reports_running_total() {
    let stub = menu_stub().with_page(TOP, comments_page(&ids("c", 0, 3), "1 day ago", None));
    let (fetcher, _stub) = engine(stub);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let query = CommentQuery::new().on_progress(move |n| sink.lock().unwrap().push(n));

    let (records, _) = drain(fetcher.fetch_comments(VIDEO_ID, query).unwrap()).await;

    assert_eq!(records.len(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_reply_tokens_only_when_requested() {
    let response = page(
        vec![
            view_model_thread_with_replies("t1", "REPLIES-t1-0000000001"),
            view_model_thread("t2"),
        ],
        vec![
            entity_mutation("t1", "has replies", "1 day ago", "2"),
            entity_mutation("t2", "no replies", "1 day ago", "2"),
        ],
    );
    let build = || menu_stub().with_page(TOP, response.clone());

    let (plain, _) = engine(build());
    let (records, _) = drain(plain.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;
    assert!(records.iter().all(|r| r.reply_continuation_token.is_none()));

    let (with_tokens, _) = engine(build());
    let (records, _) = drain(
        with_tokens
            .fetch_comments_with_reply_tokens(VIDEO_ID, CommentQuery::new())
            .unwrap(),
    )
    .await;
    assert_eq!(
        records[0].reply_continuation_token.as_deref(),
        Some("REPLIES-t1-0000000001")
    );
    assert!(records[1].reply_continuation_token.is_none());
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let (fetcher, stub) = engine(menu_stub());

    let stream = fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap();
    assert_eq!(stub.watch_page_requests(), 0);
    drop(stream);
    assert_eq!(stub.continuation_requests(), 0);
}
