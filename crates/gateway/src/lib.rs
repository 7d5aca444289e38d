//! Edge gateway for the bookfair platform.
//!
//! Routes browser traffic by path prefix to the backend services, answers
//! CORS preflights, tags every request with an `x-request-id` and exposes
//! its own `/health` and `/metrics`.

pub mod config;
pub mod proxy;
pub mod routes;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use axum::routing::get;
use axum::{Json, Router, extract::State};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use proxy::ProxyState;
use routes::RouteTable;

/// Browser origins allowed to call the gateway.
pub const ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
    "http://localhost:5174",
];

const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "gateway" }))
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> impl axum::response::IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

fn cors() -> CorsLayer {
    let origins = ALLOWED_ORIGINS.map(HeaderValue::from_static);
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // Credentials rule out the `*` wildcard, so requested headers are echoed.
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

/// Creates the gateway router.
pub fn create_app(config: &Config, metrics_handle: PrometheusHandle) -> Router {
    let state = ProxyState::new(RouteTable::new(&config.upstreams), config.timeout);

    let metrics_router = Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health))
        .fallback(proxy::forward)
        .with_state(state)
        .merge(metrics_router)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
