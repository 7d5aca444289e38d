//! Notification endpoints under `/api/notifications`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use domain::notification::NotificationRequest;
use domain::{CancellationEvent, NotificationJob, RegistrationEvent, ReservationEvent};
use serde::{Deserialize, Serialize};
use store::{NotificationRecord, NotificationStats};

use super::parse_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::NotificationState;

pub fn router(state: NotificationState) -> Router {
    Router::new()
        .route("/api/notifications", get(all))
        .route("/api/notifications/events/reservation", post(reservation_event))
        .route("/api/notifications/events/registration", post(registration_event))
        .route("/api/notifications/events/cancellation", post(cancellation_event))
        .route("/api/notifications/send", post(send))
        .route("/api/notifications/stats", get(stats))
        .route("/api/notifications/recent", get(recent))
        .route("/api/notifications/date-range", get(date_range))
        .route("/api/notifications/email/{email}", get(by_email))
        .route("/api/notifications/type/{kind}", get(by_type))
        .route("/api/notifications/status/{status}", get(by_status))
        .route("/api/notifications/{id}", get(get_notification))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub status: &'static str,
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

async fn accept(
    state: &NotificationState,
    job: NotificationJob,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    let kind = job.kind();
    state.queue.enqueue(job).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            status: "accepted",
            kind,
        }),
    ))
}

/// POST /api/notifications/events/reservation
pub async fn reservation_event(
    State(state): State<NotificationState>,
    ApiJson(event): ApiJson<ReservationEvent>,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    accept(&state, NotificationJob::Reservation(event)).await
}

/// POST /api/notifications/events/registration
pub async fn registration_event(
    State(state): State<NotificationState>,
    ApiJson(event): ApiJson<RegistrationEvent>,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    accept(&state, NotificationJob::Registration(event)).await
}

/// POST /api/notifications/events/cancellation
pub async fn cancellation_event(
    State(state): State<NotificationState>,
    ApiJson(event): ApiJson<CancellationEvent>,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    accept(&state, NotificationJob::Cancellation(event)).await
}

/// POST /api/notifications/send: delivers synchronously.
#[tracing::instrument(skip(state, req), fields(to = %req.recipient_email))]
pub async fn send(
    State(state): State<NotificationState>,
    ApiJson(req): ApiJson<NotificationRequest>,
) -> Result<Json<NotificationRecord>, ApiError> {
    Ok(Json(state.service.send(req).await?))
}

/// GET /api/notifications
pub async fn all(
    State(state): State<NotificationState>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    Ok(Json(state.service.all().await?))
}

/// GET /api/notifications/{id}
pub async fn get_notification(
    State(state): State<NotificationState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get(id).await?))
}

pub async fn by_email(
    State(state): State<NotificationState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    Ok(Json(state.service.by_email(&email).await?))
}

pub async fn by_type(
    State(state): State<NotificationState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    Ok(Json(state.service.by_type(&kind).await?))
}

pub async fn by_status(
    State(state): State<NotificationState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    Ok(Json(state.service.by_status(&status).await?))
}

/// GET /api/notifications/stats
pub async fn stats(
    State(state): State<NotificationState>,
) -> Result<Json<NotificationStats>, ApiError> {
    Ok(Json(state.service.stats().await?))
}

/// GET /api/notifications/recent?limit=
pub async fn recent(
    State(state): State<NotificationState>,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    Ok(Json(state.service.recent(query.limit).await?))
}

/// GET /api/notifications/date-range?start&end: RFC 3339 timestamps.
pub async fn date_range(
    State(state): State<NotificationState>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    Ok(Json(state.service.date_range(range.start, range.end).await?))
}
