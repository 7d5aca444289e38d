use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use gateway::config::{Config, Upstreams};
use httpmock::prelude::*;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Gateway with every upstream pointing at `base_url`.
fn app(base_url: &str) -> Router {
    let upstreams = Upstreams {
        auth: base_url.to_string(),
        profile: base_url.to_string(),
        stall: base_url.to_string(),
        reservation: base_url.to_string(),
        notification: base_url.to_string(),
    };
    let config = Config {
        upstreams,
        ..Config::default()
    };
    gateway::create_app(&config, get_metrics_handle())
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn forwards_method_query_headers_and_body() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/reservations")
                .query_param("notify", "true")
                .header("authorization", "Bearer token-1")
                .header_exists("x-request-id")
                .json_body(json!({ "stallIds": ["A1"] }));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({ "success": true, "data": { "id": 7 } }));
        })
        .await;

    let response = app(&server.base_url())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/reservations?notify=true")
                .header("authorization", "Bearer token-1")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"stallIds":["A1"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    upstream.assert_async().await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await["data"]["id"], 7);
}

#[tokio::test]
async fn keeps_caller_request_id() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/stalls/available")
                .header("x-request-id", "trace-42");
            then.status(200).json_body(json!([]));
        })
        .await;

    let response = app(&server.base_url())
        .oneshot(
            Request::builder()
                .uri("/api/stalls/available")
                .header("x-request-id", "trace-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    upstream.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn upstream_errors_pass_through() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth/register");
            then.status(400).body("User already exists");
        })
        .await;

    let response = app(&server.base_url())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"User already exists");
}

#[tokio::test]
async fn service_health_is_rewritten() {
    let server = MockServer::start_async().await;
    let upstream = server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .json_body(json!({ "status": "ok", "service": "profile-service" }));
        })
        .await;

    let response = app(&server.base_url())
        .oneshot(
            Request::builder()
                .uri("/health/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    upstream.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["service"], "profile-service");
}

#[tokio::test]
async fn own_health() {
    let response = app("http://127.0.0.1:1")
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "ok", "service": "gateway" })
    );
}

#[tokio::test]
async fn unmatched_path_is_404() {
    let response = app("http://127.0.0.1:1")
        .oneshot(
            Request::builder()
                .uri("/api/billing/invoices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No matching route found");
}

#[tokio::test]
async fn unreachable_upstream_is_502() {
    // Nothing listens on port 1.
    let router = app("http://127.0.0.1:1");
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/stalls")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "Upstream request failed");

    let metrics = app("http://127.0.0.1:1")
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(metrics.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("gateway_requests_total"));
}

#[tokio::test]
async fn cors_preflight_for_known_origin() {
    let response = app("http://127.0.0.1:1")
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/login")
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,authorization")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "http://localhost:5173"
    );
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-max-age"], "3600");
    assert_eq!(
        headers["access-control-allow-headers"],
        "content-type,authorization"
    );
}

#[tokio::test]
async fn cors_ignores_unknown_origin() {
    let response = app("http://127.0.0.1:1")
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/login")
                .header("origin", "http://evil.example")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
