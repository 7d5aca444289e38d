//! Account endpoints under `/api/auth`.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use domain::AuthService;
use domain::auth::{
    AllUsersResponse, DeleteUserResponse, LoginRequest, LoginResponse, RegisterRequest,
    RegisterResponse, UserResponse,
};
use serde::Deserialize;

use super::parse_user_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, AuthorizationHeader, CurrentUser};
use crate::state::ServiceState;

type AuthState = ServiceState<AuthService>;

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/user/delete/{id}", delete(delete_user))
        .route("/api/auth/user/details", get(user_details))
        .route("/api/auth/user/{id}", get(user_by_id))
        .route("/api/auth/users", get(all_users))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub email: String,
}

/// POST /api/auth/register
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AuthState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    Ok(Json(state.service.register(req).await?))
}

/// POST /api/auth/login
#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<AuthState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    Ok(Json(state.service.login(req).await?))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AuthState>,
    header: AuthorizationHeader,
) -> Result<&'static str, ApiError> {
    Ok(state.service.logout(header.0.as_deref())?)
}

/// DELETE /api/auth/user/delete/{id}: admin only.
#[tracing::instrument(skip(state, user))]
pub async fn delete_user(
    State(state): State<AuthState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteUserResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    Ok(Json(state.service.delete_user(&user.caller, id).await?))
}

/// GET /api/auth/user/details?email=
#[tracing::instrument(skip(state, _user))]
pub async fn user_details(
    State(state): State<AuthState>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<DetailsQuery>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.service.user_details(&query.email).await?))
}

/// GET /api/auth/user/{id}
pub async fn user_by_id(
    State(state): State<AuthState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    Ok(Json(state.service.user_by_id(id).await?))
}

/// GET /api/auth/users: admin only.
pub async fn all_users(
    State(state): State<AuthState>,
    user: CurrentUser,
) -> Result<Json<AllUsersResponse>, ApiError> {
    Ok(Json(state.service.all_users(&user.caller).await?))
}
