//! HTTP services of the bookfair stall reservation platform.
//!
//! One binary serves any one service, or all of them at once, with
//! structured logging (tracing) and Prometheus metrics.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use common::JwtService;
use domain::{AuthService, ProfileService, ReservationService, StallService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::{NotificationState, ServiceState};

/// The services one process exposes. `None` leaves its routes unmounted.
pub struct Services {
    /// Reported by `/health`.
    pub name: &'static str,
    pub jwt: JwtService,
    pub auth: Option<Arc<AuthService>>,
    pub profiles: Option<Arc<ProfileService>>,
    pub stalls: Option<Arc<StallService>>,
    pub reservations: Option<Arc<ReservationService>>,
    pub notifications: Option<NotificationState>,
}

impl Services {
    pub fn new(name: &'static str, jwt: JwtService) -> Self {
        Self {
            name,
            jwt,
            auth: None,
            profiles: None,
            stalls: None,
            reservations: None,
            notifications: None,
        }
    }
}

/// Creates the Axum application router for the given services.
pub fn create_app(services: Services, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let mut app = Router::new()
        .route("/health", get(routes::health::check))
        .with_state(services.name)
        .merge(metrics_router);

    let jwt = services.jwt;
    if let Some(auth) = services.auth {
        app = app.merge(routes::auth::router(ServiceState::new(auth, jwt.clone())));
    }
    if let Some(profiles) = services.profiles {
        app = app.merge(routes::profiles::router(ServiceState::new(
            profiles,
            jwt.clone(),
        )));
    }
    if let Some(stalls) = services.stalls {
        app = app.merge(routes::stalls::router(ServiceState::new(stalls, jwt.clone())));
    }
    if let Some(reservations) = services.reservations {
        app = app.merge(routes::reservations::router(ServiceState::new(
            reservations,
            jwt.clone(),
        )));
    }
    if let Some(notifications) = services.notifications {
        app = app.merge(routes::notifications::router(notifications));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
}
