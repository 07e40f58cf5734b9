//! Endpoint resolution scenarios
//!
//! Each test drives a full fetch so the chosen strategy is observed through
//! the continuation tokens actually requested.

use ytmeta::comment::CommentQuery;
use ytmeta::models::SortOrder;
use ytmeta::utils::error::CommentError;

use crate::common::*;

fn recent() -> CommentQuery {
    CommentQuery::new().sort(SortOrder::Recent)
}

// ============================================================================
// Sort menu
// ============================================================================

#[tokio::test]
async fn test_sort_menu_picks_requested_order() {
    let stub = StubTransport::new()
        .with_initial_data(initial_data_with_menu("TOP-0000000000000001", "NEW-0000000000000001"))
        .with_page("NEW-0000000000000001", comments_page(&ids("n", 0, 2), "1 hour ago", None));
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, recent()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 2);
    assert_eq!(stub.requested_tokens(), vec!["NEW-0000000000000001"]);
}

#[tokio::test]
async fn test_video_url_accepted() {
    let stub = StubTransport::new()
        .with_initial_data(initial_data_with_menu("TOP-0000000000000001", "NEW-0000000000000001"))
        .with_page("TOP-0000000000000001", comments_page(&ids("t", 0, 1), "1 hour ago", None));
    let (fetcher, _stub) = engine(stub);

    let url = format!("https://www.youtube.com/watch?v={VIDEO_ID}&t=42s");
    let (records, error) = drain(fetcher.fetch_comments(&url, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 1);
}

// ============================================================================
// Item section fallback
// ============================================================================

#[tokio::test]
async fn test_item_section_serves_default_sort() {
    let stub = StubTransport::new()
        .with_initial_data(initial_data_with_section("SECTION-000000000001"))
        .with_page("SECTION-000000000001", comments_page(&ids("s", 0, 3), "1 day ago", None));
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 3);
    assert_eq!(stub.requested_tokens(), vec!["SECTION-000000000001"]);
}

#[tokio::test]
async fn test_item_section_cannot_serve_recent() {
    // The probe lands on a plain comment page that carries no sort menu
    let stub = StubTransport::new()
        .with_initial_data(initial_data_with_section("SECTION-000000000001"))
        .with_page("SECTION-000000000001", comments_page(&ids("s", 0, 3), "1 day ago", None));
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, recent()).unwrap()).await;

    assert!(records.is_empty());
    assert!(matches!(
        error,
        Some(CommentError::EndpointNotFound { sort: SortOrder::Recent })
    ));
    assert_eq!(stub.continuation_requests(), 1);
}

// ============================================================================
// Probe request
// ============================================================================

#[tokio::test]
async fn test_probe_finds_menu_in_response_header() {
    let stub = StubTransport::new()
        .with_initial_data(initial_data_with_panel("PANEL-00000000000001"))
        .with_page("PANEL-00000000000001", probe_response("TOP-0000000000000002", "NEW-0000000000000002"))
        .with_page("NEW-0000000000000002", comments_page(&ids("n", 0, 2), "5 minutes ago", None));
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, recent()).unwrap()).await;

    assert!(error.is_none());
    assert_eq!(records.len(), 2);
    assert_eq!(
        stub.requested_tokens(),
        vec!["PANEL-00000000000001", "NEW-0000000000000002"]
    );
}

#[tokio::test]
async fn test_probe_failure_is_resource_unavailable() {
    let stub = StubTransport::new()
        .with_initial_data(initial_data_with_panel("PANEL-00000000000001"))
        .with_failure("PANEL-00000000000001", 503);
    let (fetcher, _stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, recent()).unwrap()).await;

    assert!(records.is_empty());
    assert!(matches!(error, Some(CommentError::ResourceUnavailable(_))));
}

// ============================================================================
// No comment endpoint
// ============================================================================

#[tokio::test]
async fn test_comments_disabled() {
    let stub = StubTransport::new().with_initial_data(initial_data_without_comments());
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(records.is_empty());
    assert!(matches!(
        error,
        Some(CommentError::EndpointNotFound { sort: SortOrder::Top })
    ));
    assert_eq!(stub.continuation_requests(), 0);
}

#[tokio::test]
async fn test_page_without_initial_data() {
    let stub = StubTransport::new()
        .with_watch_page("<html><body><p>consent required</p></body></html>".to_string());
    let (fetcher, stub) = engine(stub);

    let (records, error) = drain(fetcher.fetch_comments(VIDEO_ID, CommentQuery::new()).unwrap()).await;

    assert!(records.is_empty());
    assert!(matches!(error, Some(CommentError::EndpointNotFound { .. })));
    assert_eq!(stub.continuation_requests(), 0);
}
