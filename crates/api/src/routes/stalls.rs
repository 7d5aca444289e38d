//! Stall inventory endpoints under `/api/stalls`.
//!
//! Reads are public. Writes need an ADMIN token.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::NaiveDate;
use domain::StallService;
use domain::stall::{
    AvailabilityResponse, CreateStallRequest, StallResponse, StatusUpdateRequest,
    UpdateStallRequest,
};
use serde::Deserialize;

use super::parse_stall_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::state::ServiceState;

type StallState = ServiceState<StallService>;

pub fn router(state: StallState) -> Router {
    Router::new()
        .route("/api/stalls", get(list_all).post(create))
        .route("/api/stalls/available", get(list_available))
        .route("/api/stalls/available/size/{size}", get(list_available_by_size))
        .route(
            "/api/stalls/available/section/{section}",
            get(list_available_by_section),
        )
        .route("/api/stalls/size/{size}", get(list_by_size))
        .route("/api/stalls/status/{status}", get(list_by_status))
        .route("/api/stalls/section/{section}", get(list_by_section))
        .route("/api/stalls/code/{code}", get(get_by_code))
        .route("/api/stalls/code/{code}/status", patch(update_status_by_code))
        .route("/api/stalls/check-availability/{code}", get(check_by_code))
        .route(
            "/api/stalls/{id}",
            get(get_by_id).put(update).delete(remove),
        )
        .route("/api/stalls/{id}/status", patch(update_status_by_id))
        .route("/api/stalls/{id}/availability", get(check_by_id))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// POST /api/stalls
#[tracing::instrument(skip(state, user, req))]
pub async fn create(
    State(state): State<StallState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateStallRequest>,
) -> Result<(StatusCode, Json<StallResponse>), ApiError> {
    let stall = state.service.create(&user.caller, req).await?;
    Ok((StatusCode::CREATED, Json(stall)))
}

/// GET /api/stalls
pub async fn list_all(
    State(state): State<StallState>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_all().await?))
}

/// GET /api/stalls/{id}
pub async fn get_by_id(
    State(state): State<StallState>,
    Path(id): Path<String>,
) -> Result<Json<StallResponse>, ApiError> {
    let id = parse_stall_id(&id)?;
    Ok(Json(state.service.get_by_id(id).await?))
}

/// GET /api/stalls/code/{code}
pub async fn get_by_code(
    State(state): State<StallState>,
    Path(code): Path<String>,
) -> Result<Json<StallResponse>, ApiError> {
    Ok(Json(state.service.get_by_code(&code).await?))
}

pub async fn list_available(
    State(state): State<StallState>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_available().await?))
}

pub async fn list_by_size(
    State(state): State<StallState>,
    Path(size): Path<String>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_by_size(&size).await?))
}

pub async fn list_by_status(
    State(state): State<StallState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_by_status(&status).await?))
}

pub async fn list_by_section(
    State(state): State<StallState>,
    Path(section): Path<String>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_by_section(&section).await?))
}

pub async fn list_available_by_size(
    State(state): State<StallState>,
    Path(size): Path<String>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_available_by_size(&size).await?))
}

pub async fn list_available_by_section(
    State(state): State<StallState>,
    Path(section): Path<String>,
) -> Result<Json<Vec<StallResponse>>, ApiError> {
    Ok(Json(state.service.list_available_by_section(&section).await?))
}

/// PUT /api/stalls/{id}
#[tracing::instrument(skip(state, user, req))]
pub async fn update(
    State(state): State<StallState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStallRequest>,
) -> Result<Json<StallResponse>, ApiError> {
    let id = parse_stall_id(&id)?;
    Ok(Json(state.service.update(&user.caller, id, req).await?))
}

/// PATCH /api/stalls/{id}/status
#[tracing::instrument(skip(state, user, req))]
pub async fn update_status_by_id(
    State(state): State<StallState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> Result<Json<StallResponse>, ApiError> {
    let id = parse_stall_id(&id)?;
    Ok(Json(
        state
            .service
            .update_status_by_id(&user.caller, id, &req.status)
            .await?,
    ))
}

/// PATCH /api/stalls/code/{code}/status
#[tracing::instrument(skip(state, user, req))]
pub async fn update_status_by_code(
    State(state): State<StallState>,
    user: CurrentUser,
    Path(code): Path<String>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> Result<Json<StallResponse>, ApiError> {
    Ok(Json(
        state
            .service
            .update_status_by_code(&user.caller, &code, &req.status)
            .await?,
    ))
}

/// DELETE /api/stalls/{id}
#[tracing::instrument(skip(state, user))]
pub async fn remove(
    State(state): State<StallState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_stall_id(&id)?;
    state.service.delete(&user.caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stalls/check-availability/{code}
pub async fn check_by_code(
    State(state): State<StallState>,
    Path(code): Path<String>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    Ok(Json(state.service.check_availability_by_code(&code).await?))
}

/// GET /api/stalls/{id}/availability?start_date&end_date
///
/// The reservation check only runs when both dates are given.
pub async fn check_by_id(
    State(state): State<StallState>,
    Path(id): Path<String>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let id = parse_stall_id(&id)?;
    let dates = range.start_date.zip(range.end_date);
    Ok(Json(state.service.check_availability_by_id(id, dates).await?))
}
