use async_trait::async_trait;
use common::UserId;

use super::{PortError, Unreachable};
use crate::auth::UserResponse;
use crate::profile::CreateProfileRequest;
use crate::reservation::ReservationResponse;

/// Profile bookkeeping done by the auth service.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn create_profile(&self, request: CreateProfileRequest) -> Result<(), PortError>;

    async fn delete_profile(&self, user_id: UserId) -> Result<(), PortError>;
}

/// Reservation history shown on the vendor dashboard.
#[async_trait]
pub trait ReservationDirectory: Send + Sync {
    /// The bearer token, when given, is forwarded as-is.
    async fn reservations_for_user(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<Vec<ReservationResponse>, PortError>;
}

/// Account details shown on the vendor dashboard.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn account_by_email(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<Option<UserResponse>, PortError>;
}

#[async_trait]
impl ProfileDirectory for Unreachable {
    async fn create_profile(&self, _request: CreateProfileRequest) -> Result<(), PortError> {
        Err(Self::error("profile-service"))
    }

    async fn delete_profile(&self, _user_id: UserId) -> Result<(), PortError> {
        Err(Self::error("profile-service"))
    }
}

#[async_trait]
impl ReservationDirectory for Unreachable {
    async fn reservations_for_user(
        &self,
        _user_id: UserId,
        _token: Option<&str>,
    ) -> Result<Vec<ReservationResponse>, PortError> {
        Err(Self::error("reservation-service"))
    }
}

#[async_trait]
impl AccountDirectory for Unreachable {
    async fn account_by_email(
        &self,
        _email: &str,
        _token: Option<&str>,
    ) -> Result<Option<UserResponse>, PortError> {
        Err(Self::error("auth-service"))
    }
}
