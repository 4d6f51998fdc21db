use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::integration::common::{TURING_PARAGRAPH, setup_test_app};

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router.clone(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["in_flight"], 0);
}

#[tokio::test]
async fn summary_returns_title_and_lead_paragraph() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router.clone(), "/v1/summaries/Turing_Award").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["id"], "Turing_Award");
    assert_eq!(json["title"], "Turing Award");
    assert_eq!(json["summary"], TURING_PARAGRAPH);
}

#[tokio::test]
async fn repeated_summary_is_served_from_cache() {
    let app = setup_test_app().await;

    let (_, first) = get_json(app.router.clone(), "/v1/summaries/Turing_Award").await;
    let (_, second) = get_json(app.router.clone(), "/v1/summaries/Turing_Award").await;

    assert_eq!(first, second);
    assert_eq!(app.upstream_hits(), 1);
}

#[tokio::test]
async fn concurrent_requests_share_one_upstream_fetch() {
    let app = setup_test_app().await;

    let (a, b) = tokio::join!(
        get_json(app.router.clone(), "/v1/summaries/Turing_Award"),
        get_json(app.router.clone(), "/v1/summaries/Turing_Award"),
    );

    assert_eq!(a.1["ok"], true);
    assert_eq!(a, b);
    assert_eq!(app.upstream_hits(), 1);
}

#[tokio::test]
async fn encoded_slash_names_one_document() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router.clone(), "/v1/summaries/AC%2FDC").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["title"], "AC/DC");
}

#[tokio::test]
async fn missing_document_returns_ok_false_with_readable_title() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router.clone(), "/v1/summaries/Grace_Hopper").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({
            "ok": false,
            "id": "Grace_Hopper",
            "title": "Grace Hopper",
            "summary": null,
        })
    );
}

#[tokio::test]
async fn failures_are_not_cached() {
    let app = setup_test_app().await;

    get_json(app.router.clone(), "/v1/summaries/Stub").await;
    let (_, json) = get_json(app.router.clone(), "/v1/summaries/Stub").await;

    assert_eq!(json["ok"], false);
    assert_eq!(app.upstream_hits(), 2);
}

#[tokio::test]
async fn dot_dot_id_returns_400() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router.clone(), "/v1/summaries/%2E%2E").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_document_id");
    assert_eq!(app.upstream_hits(), 0);
}

#[tokio::test]
async fn openapi_document_lists_summary_route() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router.clone(), "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/summaries/{id}"]["get"].is_object());
    assert!(json["paths"]["/health"]["get"].is_object());
}
