//! In-process port implementations over the stores.
//!
//! Used when every service runs in one process and shares one store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{StallId, UserId};
use store::{ProfileStore, ReservationStore, StallStore, StoreError, UserStore};

use super::{
    AccountDirectory, BookingCalendar, PortError, ProfileDirectory, ReservationDirectory,
    StallCatalog, StallSummary,
};
use crate::auth::UserResponse;
use crate::profile::CreateProfileRequest;
use crate::reservation::ReservationResponse;

fn store_failure(service: &'static str, error: StoreError) -> PortError {
    let status = match error {
        StoreError::NotFound { .. } => 404,
        StoreError::Conflict(_) | StoreError::ConcurrencyConflict { .. } => 409,
        _ => 500,
    };
    PortError::Rejected {
        service,
        status,
        message: error.to_string(),
    }
}

#[derive(Clone)]
pub struct LocalStallCatalog {
    stalls: Arc<dyn StallStore>,
}

impl LocalStallCatalog {
    pub fn new(stalls: Arc<dyn StallStore>) -> Self {
        Self { stalls }
    }
}

#[async_trait]
impl StallCatalog for LocalStallCatalog {
    async fn stall(&self, id: StallId) -> Result<Option<StallSummary>, PortError> {
        self.stalls
            .find_stall(id)
            .await
            .map(|stall| stall.map(StallSummary::from))
            .map_err(|e| store_failure("stall-service", e))
    }
}

#[derive(Clone)]
pub struct LocalBookingCalendar {
    reservations: Arc<dyn ReservationStore>,
}

impl LocalBookingCalendar {
    pub fn new(reservations: Arc<dyn ReservationStore>) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl BookingCalendar for LocalBookingCalendar {
    async fn is_stall_free(
        &self,
        stall: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool, PortError> {
        self.reservations
            .count_overlapping(stall, start, end)
            .await
            .map(|count| count == 0)
            .map_err(|e| store_failure("reservation-service", e))
    }
}

#[derive(Clone)]
pub struct LocalProfileDirectory {
    profiles: Arc<dyn ProfileStore>,
}

impl LocalProfileDirectory {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl ProfileDirectory for LocalProfileDirectory {
    async fn create_profile(&self, request: CreateProfileRequest) -> Result<(), PortError> {
        let profile = request
            .into_new_profile()
            .map_err(|e| PortError::Rejected {
                service: "profile-service",
                status: 400,
                message: e.to_string(),
            })?;
        self.profiles
            .insert_profile(profile)
            .await
            .map(|_| ())
            .map_err(|e| store_failure("profile-service", e))
    }

    async fn delete_profile(&self, user_id: UserId) -> Result<(), PortError> {
        self.profiles
            .delete_profile(user_id)
            .await
            .map(|_| ())
            .map_err(|e| store_failure("profile-service", e))
    }
}

#[derive(Clone)]
pub struct LocalReservationDirectory {
    reservations: Arc<dyn ReservationStore>,
}

impl LocalReservationDirectory {
    pub fn new(reservations: Arc<dyn ReservationStore>) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl ReservationDirectory for LocalReservationDirectory {
    async fn reservations_for_user(
        &self,
        user_id: UserId,
        _token: Option<&str>,
    ) -> Result<Vec<ReservationResponse>, PortError> {
        let records = self
            .reservations
            .list_reservations_for_user(user_id)
            .await
            .map_err(|e| store_failure("reservation-service", e))?;
        Ok(records.into_iter().map(ReservationResponse::from).collect())
    }
}

#[derive(Clone)]
pub struct LocalAccountDirectory {
    users: Arc<dyn UserStore>,
}

impl LocalAccountDirectory {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AccountDirectory for LocalAccountDirectory {
    async fn account_by_email(
        &self,
        email: &str,
        _token: Option<&str>,
    ) -> Result<Option<UserResponse>, PortError> {
        self.users
            .find_user_by_email(email)
            .await
            .map(|user| user.map(UserResponse::from))
            .map_err(|e| store_failure("auth-service", e))
    }
}
