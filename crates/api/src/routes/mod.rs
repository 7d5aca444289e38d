//! HTTP route handlers, one module per service.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod profiles;
pub mod reservations;
pub mod stalls;

use common::{StallId, UserId};

use crate::error::ApiError;

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse::<i64>()
        .map(UserId::new)
        .map_err(|_| ApiError::BadRequest(format!("Invalid user id: {raw}")))
}

pub(crate) fn parse_stall_id(raw: &str) -> Result<StallId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid stall id: {e}")))
}

pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid id: {raw}")))
}
