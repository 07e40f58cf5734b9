//! Error scenario integration tests
//!
//! Tests failure modes of a fetch:
//! 1. Invalid parameters, rejected before any request
//! 2. Host page failures
//! 3. Transport failures mid-chain
//! 4. Malformed entries, skipped without failing the fetch

use futures::StreamExt;
use serde_json::json;

use ytmeta::comment::CommentQuery;
use ytmeta::utils::error::{CommentError, FetchError};

use crate::common::*;

const TOP: &str = "TOP-TOKEN-0000000001";

fn menu_stub() -> StubTransport {
    StubTransport::new().with_initial_data(initial_data_with_menu(TOP, "RECENT-TOKEN-00000001"))
}

// ============================================================================
// Parameter Errors
// ============================================================================

#[tokio::test]
async fn test_invalid_video_reference() {
    let (fetcher, stub) = engine(menu_stub());

    for video in ["", "not a video", "https://example.com/watch?v=short"] {
        let result = fetcher.fetch_comments(video, CommentQuery::new());
        assert!(
            matches!(result, Err(CommentError::Configuration(_))),
            "{video:?} should be rejected"
        );
    }
    assert_eq!(stub.watch_page_requests(), 0);
}

#[tokio::test]
async fn test_zero_limit_rejected() {
    let (fetcher, stub) = engine(menu_stub());

    let result = fetcher.fetch_comments(VIDEO_ID, CommentQuery::new().limit(0));

    assert!(matches!(result, Err(CommentError::Configuration(_))));
    assert_eq!(stub.watch_page_requests(), 0);
}

// ============================================================================
// Host Page Errors
// ============================================================================

#[tokio::test]
async fn test_watch_page_failure_is_resource_unavailable() {
    let (fetcher, stub) = engine(StubTransport::new());

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(records.is_empty());
    assert!(matches!(
        error,
        Some(CommentError::ResourceUnavailable(FetchError::ServerError(404)))
    ));
    assert_eq!(stub.continuation_requests(), 0);
}

#[tokio::test]
async fn test_truncated_initial_data() {
    let stub = StubTransport::new().with_watch_page(
        "<html><script>var ytInitialData = {\"contents\": {\"broken\": </script></html>".to_string(),
    );
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(records.is_empty());
    assert!(matches!(error, Some(CommentError::EndpointNotFound { .. })));
}

// ============================================================================
// Mid-chain Errors
// ============================================================================

#[tokio::test]
async fn test_records_before_failure_are_delivered() {
    let stub = menu_stub()
        .with_page(TOP, comments_page(&ids("c", 0, 3), "1 day ago", Some("PAGE-2")))
        .with_failure("PAGE-2", 500);
    let (fetcher, stub) = engine(stub);

    let mut stream = fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap();
    let mut delivered = 0;
    let mut failure = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(_) => delivered += 1,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    assert_eq!(delivered, 3);
    assert!(matches!(
        failure,
        Some(CommentError::ResourceUnavailable(FetchError::ServerError(500)))
    ));
    // the stream is finished after its error
    assert!(stream.next().await.is_none());
    assert_eq!(stub.continuation_requests(), 2);
}

// ============================================================================
// Malformed Entries
// ============================================================================

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let items = vec![
        view_model_thread("ok1"),
        // referenced but never given content
        view_model_thread("ghost"),
        view_model_thread("ok2"),
    ];
    let mutations = vec![
        entity_mutation("ok1", "fine", "1 day ago", "1"),
        json!({"payload": {"commentEntityPayload": {"properties": {"content": {"content": "no id"}}}}}),
        entity_mutation("ok2", "also fine", "1 day ago", "1"),
    ];
    let stub = menu_stub().with_page(TOP, page(items, mutations));
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    let got: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(got, vec!["ok1", "ok2"]);
}

#[tokio::test]
async fn test_unparseable_counts_and_times_degrade() {
    let mut mutation = entity_mutation("odd", "odd values", "sometime last spring", "lots");
    mutation["payload"]["commentEntityPayload"]["toolbar"]["replyCount"] = json!(null);
    let stub = menu_stub().with_page(TOP, page(vec![view_model_thread("odd")], vec![mutation]));
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    let record = &records[0];
    assert_eq!(record.like_count, 0);
    assert_eq!(record.reply_count, 0);
    assert_eq!(record.time_human, "sometime last spring");
    assert!(record.publish_date.is_none());
    assert!(record.time_parsed.is_none());
}
