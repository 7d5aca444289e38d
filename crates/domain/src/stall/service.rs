use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use common::{Money, StallId};
use store::{StallFilter, StallRecord, StallSize, StallStatus, StallStore, StoreError};
use validator::Validate;

use super::{
    AvailabilityResponse, CreateStallRequest, StallError, StallResponse, UpdateStallRequest,
};
use crate::ports::BookingCalendar;
use crate::{Caller, DomainError, Result};

/// Stall inventory. Reads are public, writes need an admin caller.
pub struct StallService {
    stalls: Arc<dyn StallStore>,
    calendar: Arc<dyn BookingCalendar>,
}

fn parse_size(size: &str) -> Result<StallSize> {
    size.parse()
        .map_err(|e: String| StallError::InvalidValue(e).into())
}

fn parse_status(status: &str) -> Result<StallStatus> {
    status
        .parse()
        .map_err(|e: String| StallError::InvalidValue(e).into())
}

impl StallService {
    pub fn new(stalls: Arc<dyn StallStore>, calendar: Arc<dyn BookingCalendar>) -> Self {
        Self { stalls, calendar }
    }

    #[tracing::instrument(skip(self, caller, request), fields(code = %request.stall_code))]
    pub async fn create(
        &self,
        caller: &Caller,
        request: CreateStallRequest,
    ) -> Result<StallResponse> {
        caller.require_admin()?;
        request.validate()?;

        let Some(size) = request.size else {
            return Err(DomainError::Validation("Stall size is required".to_string()));
        };
        let code = request.stall_code.trim().to_string();
        if self.stalls.find_stall_by_code(&code).await?.is_some() {
            return Err(StallError::DuplicateCode(code).into());
        }

        let now = Utc::now();
        let stall = StallRecord {
            id: StallId::new(),
            stall_code: code.clone(),
            name: request.name.trim().to_string(),
            size,
            status: StallStatus::Available,
            section: request.section,
            row: request.row,
            column: request.column,
            x_position: request.x_position,
            y_position: request.y_position,
            width: request.width,
            length: request.length,
            price_per_day: Money::from_cents(request.price_per_day_cents),
            description: request.description,
            created_at: now,
            updated_at: now,
        };

        let created = self.stalls.insert_stall(stall).await.map_err(|e| match e {
            StoreError::Conflict(_) => StallError::DuplicateCode(code.clone()).into(),
            other => DomainError::from(other),
        })?;
        tracing::info!(stall_id = %created.id, "Stall created");
        Ok(created.into())
    }

    async fn list(&self, filter: StallFilter) -> Result<Vec<StallResponse>> {
        let stalls = self.stalls.list_stalls(filter).await?;
        Ok(stalls.into_iter().map(StallResponse::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<StallResponse>> {
        self.list(StallFilter::new()).await
    }

    async fn find(&self, id: StallId) -> Result<StallRecord> {
        self.stalls
            .find_stall(id)
            .await?
            .ok_or_else(|| StallError::NotFound(id).into())
    }

    async fn find_by_code(&self, code: &str) -> Result<StallRecord> {
        self.stalls
            .find_stall_by_code(code)
            .await?
            .ok_or_else(|| StallError::CodeNotFound(code.to_string()).into())
    }

    pub async fn get_by_id(&self, id: StallId) -> Result<StallResponse> {
        Ok(self.find(id).await?.into())
    }

    pub async fn get_by_code(&self, code: &str) -> Result<StallResponse> {
        Ok(self.find_by_code(code).await?.into())
    }

    pub async fn list_available(&self) -> Result<Vec<StallResponse>> {
        self.list(StallFilter::new().status(StallStatus::Available))
            .await
    }

    pub async fn list_by_size(&self, size: &str) -> Result<Vec<StallResponse>> {
        self.list(StallFilter::new().size(parse_size(size)?)).await
    }

    pub async fn list_by_status(&self, status: &str) -> Result<Vec<StallResponse>> {
        self.list(StallFilter::new().status(parse_status(status)?))
            .await
    }

    pub async fn list_by_section(&self, section: &str) -> Result<Vec<StallResponse>> {
        self.list(StallFilter::new().section(section)).await
    }

    pub async fn list_available_by_size(&self, size: &str) -> Result<Vec<StallResponse>> {
        let filter = StallFilter::new()
            .status(StallStatus::Available)
            .size(parse_size(size)?);
        self.list(filter).await
    }

    pub async fn list_available_by_section(&self, section: &str) -> Result<Vec<StallResponse>> {
        let filter = StallFilter::new()
            .status(StallStatus::Available)
            .section(section);
        self.list(filter).await
    }

    #[tracing::instrument(skip(self, caller, request))]
    pub async fn update(
        &self,
        caller: &Caller,
        id: StallId,
        request: UpdateStallRequest,
    ) -> Result<StallResponse> {
        caller.require_admin()?;
        request.validate()?;

        let mut stall = self.find(id).await?;
        request.apply(&mut stall);
        Ok(self.stalls.update_stall(stall).await?.into())
    }

    #[tracing::instrument(skip(self, caller))]
    pub async fn update_status_by_id(
        &self,
        caller: &Caller,
        id: StallId,
        status: &str,
    ) -> Result<StallResponse> {
        caller.require_admin()?;
        let status = parse_status(status)?;
        let mut stall = self.find(id).await?;
        stall.status = status;
        Ok(self.stalls.update_stall(stall).await?.into())
    }

    #[tracing::instrument(skip(self, caller))]
    pub async fn update_status_by_code(
        &self,
        caller: &Caller,
        code: &str,
        status: &str,
    ) -> Result<StallResponse> {
        caller.require_admin()?;
        let status = parse_status(status)?;
        let mut stall = self.find_by_code(code).await?;
        stall.status = status;
        Ok(self.stalls.update_stall(stall).await?.into())
    }

    #[tracing::instrument(skip(self, caller))]
    pub async fn delete(&self, caller: &Caller, id: StallId) -> Result<()> {
        caller.require_admin()?;
        if self.stalls.delete_stall(id).await? {
            tracing::info!("Stall deleted");
            Ok(())
        } else {
            Err(StallError::NotFound(id).into())
        }
    }

    pub async fn check_availability_by_code(&self, code: &str) -> Result<AvailabilityResponse> {
        Ok(match self.stalls.find_stall_by_code(code).await? {
            Some(stall) => AvailabilityResponse::from_status(&stall),
            None => AvailabilityResponse::not_found(Some(code.to_string())),
        })
    }

    /// Status check, plus a reservation check when a date range is given.
    #[tracing::instrument(skip(self))]
    pub async fn check_availability_by_id(
        &self,
        id: StallId,
        dates: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<AvailabilityResponse> {
        let Some(stall) = self.stalls.find_stall(id).await? else {
            return Ok(AvailabilityResponse::not_found(None));
        };

        let by_status = AvailabilityResponse::from_status(&stall);
        let Some((start, end)) = dates.filter(|_| by_status.available) else {
            return Ok(by_status);
        };

        let (available, message) = match self.calendar.is_stall_free(id, start, end).await {
            Ok(true) => (true, "Stall is available".to_string()),
            Ok(false) => (false, "Stall is reserved for the selected dates".to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Reservation check failed");
                (
                    false,
                    "Unable to verify reservations for the selected dates".to_string(),
                )
            }
        };

        Ok(AvailabilityResponse {
            stall_code: Some(stall.stall_code),
            available,
            message,
        })
    }
}
