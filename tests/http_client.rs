// tests/http_client.rs
//! The HTTP repository against a mocked Notion API.

mod common;

use common::*;
use notion_ingest::{
    ApiKey, AppError, FetcherConfig, NotionErrorCode, NotionHttpClient, NotionRepository,
    TrackingCapabilities, TreeFetcher,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "secret_integration_token_0123456789";

fn http_client(server: &MockServer) -> NotionHttpClient {
    NotionHttpClient::with_base_url(&ApiKey::new(KEY).unwrap(), format!("{}/v1/", server.uri()))
        .unwrap()
}

fn listing(results: Vec<serde_json::Value>, next_cursor: Option<&str>) -> serde_json::Value {
    json!({
        "object": "list",
        "results": results,
        "next_cursor": next_cursor,
        "has_more": next_cursor.is_some(),
        "type": "block",
        "block": {},
    })
}

#[tokio::test]
async fn lists_children_with_auth_and_hyphenated_id() {
    let server = MockServer::start().await;
    let root = root();
    Mock::given(method("GET"))
        .and(path(format!("/v1/blocks/{}/children", root.to_hyphenated())))
        .and(header("Authorization", format!("Bearer {}", KEY).as_str()))
        .and(header("Notion-Version", "2022-06-28"))
        .and(query_param("page_size", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![paragraph(&id(1), &root, true, "hi")], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = http_client(&server).list_children(&root, None).await.unwrap();

    assert!(!page.has_more);
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0]["id"], id(1).to_hyphenated());
}

#[tokio::test]
async fn error_bodies_become_service_errors() {
    let server = MockServer::start().await;
    let missing = id(9);
    Mock::given(method("GET"))
        .and(path(format!("/v1/pages/{}", missing.to_hyphenated())))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": "Could not find page.",
        })))
        .mount(&server)
        .await;

    let error = http_client(&server).retrieve_page(&missing).await.unwrap_err();

    match error {
        AppError::NotionService {
            code,
            message,
            status,
        } => {
            assert_eq!(code, NotionErrorCode::ObjectNotFound);
            assert_eq!(message, "Could not find page.");
            assert_eq!(status.as_u16(), 404);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn comments_are_queried_by_block_id() {
    let server = MockServer::start().await;
    let target = id(3);
    Mock::given(method("GET"))
        .and(path("/v1/comments"))
        .and(query_param("block_id", target.to_hyphenated().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [comment(&id(30), &target, false, "looks good")],
            "next_cursor": null,
            "has_more": false,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = http_client(&server).list_comments(&target, None).await.unwrap();
    assert_eq!(page.results.len(), 1);
}

#[tokio::test]
async fn fetcher_pages_through_http_and_retries_rate_limits() {
    let server = MockServer::start().await;
    let root = root();
    let children = format!("/v1/blocks/{}/children", root.to_hyphenated());

    Mock::given(method("GET"))
        .and(path(children.as_str()))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "object": "error",
            "status": 429,
            "code": "rate_limited",
            "message": "Slow down.",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(children.as_str()))
        .and(query_param("start_cursor", "next-page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![paragraph(&id(2), &root, true, "second")], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(children.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            vec![paragraph(&id(1), &root, true, "first")],
            Some("next-page"),
        )))
        .mount(&server)
        .await;

    let client: Arc<dyn NotionRepository> = Arc::new(http_client(&server));
    let fetcher = TreeFetcher::new(
        client,
        FetcherConfig {
            fetch_page_properties: false,
            ..FetcherConfig::default()
        },
        TrackingCapabilities::default(),
    );
    let document = fetcher.fetch(&root).await.unwrap();

    let order: Vec<_> = document.nodes.iter().map(|n| n.id.clone()).collect();
    assert_eq!(order, vec![id(1), id(2)]);
    assert_eq!(document.stats.listing_calls, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
