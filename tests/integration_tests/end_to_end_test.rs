//! End-to-end tests through the real HTTP transport
//!
//! A mock server plays the platform: host page with client config, sort
//! menu, and a two-page continuation chain.

use futures::TryStreamExt;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ytmeta::comment::{CommentFetcher, CommentQuery, ReplyQuery};
use ytmeta::crawler::fetcher::YoutubeFetcher;
use ytmeta::models::SortOrder;
use ytmeta::utils::error::CommentError;
use ytmeta::utils::retry::RetryConfig;

use crate::common::*;

const TOP: &str = "TOP-TOKEN-0000000001";
const RECENT: &str = "RECENT-TOKEN-00000001";

async fn mount_watch_page(server: &MockServer) {
    let ytcfg = json!({
        "INNERTUBE_API_KEY": "E2E-KEY",
        "INNERTUBE_CONTEXT": {"client": {"clientName": "WEB", "clientVersion": "2.20240601.01.00"}}
    });
    let html = watch_page_html(&initial_data_with_menu(TOP, RECENT), Some(&ytcfg));

    Mock::given(method("GET"))
        .and(path("/watch"))
        .and(query_param("v", VIDEO_ID))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, token: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/next"))
        .and(query_param("key", "E2E-KEY"))
        .and(body_partial_json(json!({
            "continuation": token,
            "context": {"client": {"clientVersion": "2.20240601.01.00"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn fetcher_for(server: &MockServer) -> CommentFetcher {
    let transport = YoutubeFetcher::with_base_url(&server.uri(), 100)
        .unwrap()
        .with_retry(RetryConfig::with_delays(1, 5, 10));
    CommentFetcher::new(Arc::new(transport))
}

#[tokio::test]
async fn test_full_fetch_over_http() {
    let server = MockServer::start().await;
    mount_watch_page(&server).await;
    mount_page(
        &server,
        RECENT,
        comments_page(&ids("e", 0, 4), "2 hours ago", Some("PAGE-2")),
    )
    .await;
    mount_page(&server, "PAGE-2", comments_page(&ids("e", 4, 3), "5 hours ago", None)).await;

    let fetcher = fetcher_for(&server);
    let query = CommentQuery::new().sort(SortOrder::Recent);
    let records: Vec<_> = fetcher
        .fetch_comments(VIDEO_ID, query)
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(records.len(), 7);
    assert_eq!(records[0].id, "e0");
    assert_eq!(records[0].text, "comment e0");
    assert_eq!(records[0].like_count, 10);
    assert!(records[0].publish_date.is_some());
    assert!(records[0].time_parsed.is_some());
}

#[tokio::test]
async fn test_replies_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/youtubei/v1/next"))
        .and(body_partial_json(json!({"continuation": "REPLIES-0000000000001"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![reply_view_model("Ugz.r1")],
            vec![entity_mutation("Ugz.r1", "a reply", "1 day ago", "0")],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    let replies: Vec<_> = fetcher
        .fetch_replies("REPLIES-0000000000001", ReplyQuery::new())
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].parent_id.as_deref(), Some("Ugz"));
}

#[tokio::test]
async fn test_persistent_server_error_ends_stream() {
    let server = MockServer::start().await;
    mount_watch_page(&server).await;

    // initial attempt plus one retry
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/next"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server);
    let result: Result<Vec<_>, _> = fetcher
        .fetch_comments(VIDEO_ID, CommentQuery::new())
        .unwrap()
        .try_collect()
        .await;

    assert!(matches!(result, Err(CommentError::ResourceUnavailable(_))));
}
