//! Reservation endpoints under `/api/reservations`.
//!
//! Every body is wrapped in [`ApiResponse`]. Only QR verification and the
//! stall availability check are public.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use common::ApiResponse;
use domain::ReservationService;
use domain::reservation::{
    CancelRequest, CreateReservationRequest, GenresUpdateRequest, QrCodeResponse,
    ReservationResponse,
};
use serde::Deserialize;

use super::{parse_id, parse_stall_id, parse_user_id};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, CurrentUser};
use crate::state::ServiceState;

type ReservationState = ServiceState<ReservationService>;

type Envelope<T> = Json<ApiResponse<T>>;

pub fn router(state: ReservationState) -> Router {
    Router::new()
        .route("/api/reservations", post(create))
        .route("/api/reservations/my-reservations", get(my_reservations))
        .route("/api/reservations/verify-qr", get(verify_qr))
        .route("/api/reservations/admin/all", get(admin_all))
        .route("/api/reservations/admin/status/{status}", get(admin_by_status))
        .route("/api/reservations/admin/{id}/complete", patch(admin_complete))
        .route("/api/reservations/user/{user_id}", get(by_user))
        .route("/api/reservations/stall/{stall_id}", get(by_stall))
        .route(
            "/api/reservations/stall/{stall_id}/availability",
            get(stall_availability),
        )
        .route("/api/reservations/{id}", get(get_reservation))
        .route("/api/reservations/{id}/cancel", patch(cancel))
        .route("/api/reservations/{id}/genres", patch(update_genres))
        .route("/api/reservations/{id}/qrcode", get(qr_code))
        .route("/api/reservations/{id}/qrcode/download", get(download_qr))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// POST /api/reservations
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.caller.user_id))]
pub async fn create(
    State(state): State<ReservationState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateReservationRequest>,
) -> Result<(StatusCode, Envelope<ReservationResponse>), ApiError> {
    let reservation = state.service.create(req, &user.caller).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            reservation,
            "Reservation created successfully",
        )),
    ))
}

/// GET /api/reservations/my-reservations
pub async fn my_reservations(
    State(state): State<ReservationState>,
    user: CurrentUser,
) -> Result<Envelope<Vec<ReservationResponse>>, ApiError> {
    let reservations = state.service.my_reservations(&user.caller).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservations,
        "Reservations retrieved successfully",
    )))
}

/// GET /api/reservations/{id}
pub async fn get_reservation(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Envelope<ReservationResponse>, ApiError> {
    let id = parse_id(&id)?;
    let reservation = state.service.get(id, &user.caller).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservation,
        "Reservation retrieved successfully",
    )))
}

/// PATCH /api/reservations/{id}/cancel: the body is optional.
#[tracing::instrument(skip(state, user, req))]
pub async fn cancel(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(id): Path<String>,
    req: Option<ApiJson<CancelRequest>>,
) -> Result<Envelope<ReservationResponse>, ApiError> {
    let id = parse_id(&id)?;
    let reason = req.and_then(|ApiJson(r)| r.reason);
    let reservation = state.service.cancel(id, &user.caller, reason).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservation,
        "Reservation cancelled successfully",
    )))
}

/// PATCH /api/reservations/{id}/genres
pub async fn update_genres(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<GenresUpdateRequest>,
) -> Result<Envelope<ReservationResponse>, ApiError> {
    let id = parse_id(&id)?;
    let reservation = state
        .service
        .update_genres(id, &user.caller, req.genres)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        reservation,
        "Genres updated successfully",
    )))
}

/// GET /api/reservations/{id}/qrcode
pub async fn qr_code(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Envelope<QrCodeResponse>, ApiError> {
    let id = parse_id(&id)?;
    let qr = state.service.qr_code(id, &user.caller).await?;
    Ok(Json(ApiResponse::success_with_message(
        qr,
        "QR code retrieved successfully",
    )))
}

/// GET /api/reservations/{id}/qrcode/download: the PNG as an attachment.
pub async fn download_qr(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let download = state.service.download_qr(id, &user.caller).await?;
    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.png,
    ))
}

/// GET /api/reservations/verify-qr?code=: public, used at the entrance.
#[tracing::instrument(skip(state))]
pub async fn verify_qr(
    State(state): State<ReservationState>,
    ApiQuery(query): ApiQuery<VerifyQuery>,
) -> Result<Envelope<ReservationResponse>, ApiError> {
    let reservation = state.service.verify_qr(&query.code).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservation,
        "QR code verified successfully",
    )))
}

/// GET /api/reservations/admin/all
pub async fn admin_all(
    State(state): State<ReservationState>,
    user: CurrentUser,
) -> Result<Envelope<Vec<ReservationResponse>>, ApiError> {
    let reservations = state.service.all(&user.caller).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservations,
        "All reservations retrieved successfully",
    )))
}

/// GET /api/reservations/admin/status/{status}
pub async fn admin_by_status(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(status): Path<String>,
) -> Result<Envelope<Vec<ReservationResponse>>, ApiError> {
    let reservations = state.service.by_status(&user.caller, &status).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservations,
        "Reservations retrieved successfully",
    )))
}

/// PATCH /api/reservations/admin/{id}/complete
#[tracing::instrument(skip(state, user))]
pub async fn admin_complete(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Envelope<ReservationResponse>, ApiError> {
    let id = parse_id(&id)?;
    let reservation = state.service.complete(&user.caller, id).await?;
    Ok(Json(ApiResponse::success_with_message(
        reservation,
        "Reservation completed successfully",
    )))
}

/// GET /api/reservations/user/{user_id}: own id or admin.
pub async fn by_user(
    State(state): State<ReservationState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Envelope<Vec<ReservationResponse>>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let reservations = state.service.by_user(&user.caller, user_id).await?;
    Ok(Json(ApiResponse::success(reservations)))
}

/// GET /api/reservations/stall/{stall_id}
pub async fn by_stall(
    State(state): State<ReservationState>,
    _user: CurrentUser,
    Path(stall_id): Path<String>,
) -> Result<Envelope<Vec<ReservationResponse>>, ApiError> {
    let stall_id = parse_stall_id(&stall_id)?;
    let reservations = state.service.by_stall(stall_id).await?;
    Ok(Json(ApiResponse::success(reservations)))
}

/// GET /api/reservations/stall/{stall_id}/availability?start_date&end_date
///
/// `data` is true when no active reservation overlaps the range.
pub async fn stall_availability(
    State(state): State<ReservationState>,
    Path(stall_id): Path<String>,
    ApiQuery(range): ApiQuery<AvailabilityQuery>,
) -> Result<Envelope<bool>, ApiError> {
    let stall_id = parse_stall_id(&stall_id)?;
    let free = state
        .service
        .stall_availability(stall_id, range.start_date, range.end_date)
        .await?;
    Ok(Json(ApiResponse::success(free)))
}
