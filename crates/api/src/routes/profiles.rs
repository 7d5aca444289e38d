//! Vendor profile endpoints under `/api/profiles`.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use domain::ProfileService;
use domain::profile::{
    CreateProfileRequest, GenresRequest, RichProfileRequest, UpdateProfileRequest,
    VendorDashboard,
};
use serde::Deserialize;
use store::ProfileRecord;

use super::parse_user_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, AuthorizationHeader};
use crate::state::ServiceState;

type ProfileState = ServiceState<ProfileService>;

pub fn router(state: ProfileState) -> Router {
    Router::new()
        .route("/api/profiles", post(create))
        .route("/api/profiles/search", get(search))
        .route(
            "/api/profiles/{user_id}",
            get(get_profile).put(update).delete(remove),
        )
        .route("/api/profiles/{user_id}/rich-info", patch(update_rich_info))
        .route("/api/profiles/{user_id}/genres", put(replace_genres))
        .route("/api/profiles/{user_id}/dashboard", get(dashboard))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub genre: String,
}

/// POST /api/profiles
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id))]
pub async fn create(
    State(state): State<ProfileState>,
    ApiJson(req): ApiJson<CreateProfileRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    Ok(Json(state.service.create(req).await?))
}

/// GET /api/profiles/{user_id}
pub async fn get_profile(
    State(state): State<ProfileState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.service.get(user_id).await?))
}

/// PUT /api/profiles/{user_id}: only the fields present change.
#[tracing::instrument(skip(state, patch))]
pub async fn update(
    State(state): State<ProfileState>,
    Path(user_id): Path<String>,
    ApiJson(patch): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.service.update(user_id, patch).await?))
}

/// DELETE /api/profiles/{user_id}
#[tracing::instrument(skip(state))]
pub async fn remove(
    State(state): State<ProfileState>,
    Path(user_id): Path<String>,
) -> Result<&'static str, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    state.service.delete(user_id).await?;
    Ok("Profile deleted")
}

/// PATCH /api/profiles/{user_id}/rich-info
pub async fn update_rich_info(
    State(state): State<ProfileState>,
    Path(user_id): Path<String>,
    ApiJson(rich): ApiJson<RichProfileRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.service.update_rich_info(user_id, rich).await?))
}

/// PUT /api/profiles/{user_id}/genres
pub async fn replace_genres(
    State(state): State<ProfileState>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<GenresRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(
        state
            .service
            .replace_genres(user_id, req.literary_genres)
            .await?,
    ))
}

/// GET /api/profiles/search?genre=
pub async fn search(
    State(state): State<ProfileState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<ProfileRecord>>, ApiError> {
    Ok(Json(state.service.search_by_genre(&query.genre).await?))
}

/// GET /api/profiles/{user_id}/dashboard: forwards the caller's token.
#[tracing::instrument(skip(state, header))]
pub async fn dashboard(
    State(state): State<ProfileState>,
    header: AuthorizationHeader,
    Path(user_id): Path<String>,
) -> Result<Json<VendorDashboard>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(
        state.service.dashboard(user_id, header.token()).await?,
    ))
}
