//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{ApiResponse, JwtError};
use domain::{
    AuthError, DomainError, NotificationError, ProfileError, ReservationError, StallError,
};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Every variant renders as the `{success: false, error, timestamp}` envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Domain logic error.
    Domain(DomainError),
    /// Missing or unusable credentials.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => domain_status(err),
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Domain(err) => err.to_string(),
            ApiError::Unauthorized(msg)
            | ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg,
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "internal server error");
        }

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Auth(err) => match err {
            AuthError::UserExists(_) | AuthError::NoToken | AuthError::InvalidRole(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Token(JwtError::Config(_) | JwtError::GenerationFailed(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound(_) | AuthError::EmailNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        DomainError::Profile(err) => match err {
            ProfileError::InvalidRole(_) => StatusCode::BAD_REQUEST,
            ProfileError::NotFound(_) => StatusCode::NOT_FOUND,
            ProfileError::AlreadyExists(_) => StatusCode::CONFLICT,
        },
        DomainError::Stall(err) => match err {
            StallError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            StallError::NotFound(_) | StallError::CodeNotFound(_) => StatusCode::NOT_FOUND,
            StallError::DuplicateCode(_) => StatusCode::CONFLICT,
        },
        DomainError::Reservation(err) => match err {
            ReservationError::LimitExceeded { .. } | ReservationError::Invalid(_) => {
                StatusCode::BAD_REQUEST
            }
            ReservationError::NotFound(_) | ReservationError::QrNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ReservationError::StallNotAvailable(_) => StatusCode::CONFLICT,
        },
        DomainError::Notification(err) => match err {
            NotificationError::MissingRecipient
            | NotificationError::UnknownTemplate(_)
            | NotificationError::EmptyBody => StatusCode::BAD_REQUEST,
            NotificationError::NotFound(_) => StatusCode::NOT_FOUND,
            NotificationError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        },
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DomainError::Store(StoreError::Conflict(_) | StoreError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        ApiError::Domain(err.into())
    }
}
