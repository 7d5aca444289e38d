//! Forwards matched requests to their upstream service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use common::ApiResponse;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::routes::RouteTable;

pub type HttpClient = Client<HttpConnector, Body>;

/// Shared by every proxied request.
#[derive(Clone)]
pub struct ProxyState {
    pub routes: Arc<RouteTable>,
    pub client: HttpClient,
    pub timeout: Duration,
}

impl ProxyState {
    pub fn new(routes: RouteTable, timeout: Duration) -> Self {
        Self {
            routes: Arc::new(routes),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            timeout,
        }
    }
}

fn record(route: &'static str, status: StatusCode) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

fn failure(route: &'static str, status: StatusCode, message: &str) -> Response {
    record(route, status);
    (status, Json(ApiResponse::error(message))).into_response()
}

/// Resolves the request against the route table and relays it upstream.
///
/// Method, headers, query and body pass through unchanged. `Host` is
/// dropped so the upstream sees its own authority.
pub async fn forward(State(state): State<ProxyState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(target) = state.routes.resolve(&path) else {
        tracing::warn!(%request_id, %method, %path, "no route matched");
        return failure("none", StatusCode::NOT_FOUND, "No matching route found");
    };
    let route = target.route.name;

    let url = target.url(request.uri().query());
    let uri: Uri = match url.parse() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(%request_id, %url, error = %e, "invalid upstream uri");
            return failure(route, StatusCode::BAD_GATEWAY, "Upstream request failed");
        }
    };

    let (mut parts, body) = request.into_parts();
    parts.uri = uri;
    parts.headers.remove(header::HOST);
    let upstream_request = Request::from_parts(parts, body);

    tracing::debug!(%request_id, %method, %path, route, "proxying request");

    match tokio::time::timeout(state.timeout, state.client.request(upstream_request)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            record(route, status);
            tracing::info!(
                %request_id,
                %method,
                %path,
                route,
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "proxied"
            );
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(e)) => {
            tracing::error!(%request_id, route, error = %e, "upstream error");
            failure(route, StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
        Err(_) => {
            tracing::error!(%request_id, route, timeout = ?state.timeout, "upstream timed out");
            failure(route, StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out")
        }
    }
}
