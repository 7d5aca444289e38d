use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Money, StallId};
use store::{StallRecord, StallSize};

use super::{PortError, Unreachable};

/// What the reservation service needs to know about a stall.
#[derive(Debug, Clone, PartialEq)]
pub struct StallSummary {
    pub id: StallId,
    pub stall_code: String,
    pub name: String,
    pub size: StallSize,
    pub section: Option<String>,
    pub price_per_day: Money,
}

impl From<StallRecord> for StallSummary {
    fn from(stall: StallRecord) -> Self {
        Self {
            id: stall.id,
            stall_code: stall.stall_code,
            name: stall.name,
            size: stall.size,
            section: stall.section,
            price_per_day: stall.price_per_day,
        }
    }
}

/// Stall lookups made by the reservation service.
#[async_trait]
pub trait StallCatalog: Send + Sync {
    /// `Ok(None)` when the stall does not exist.
    async fn stall(&self, id: StallId) -> Result<Option<StallSummary>, PortError>;
}

/// Date-range availability answered by the reservation service.
#[async_trait]
pub trait BookingCalendar: Send + Sync {
    /// True when no active reservation holds the stall on any day of `[start, end]`.
    async fn is_stall_free(
        &self,
        stall: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool, PortError>;
}

#[async_trait]
impl StallCatalog for Unreachable {
    async fn stall(&self, _id: StallId) -> Result<Option<StallSummary>, PortError> {
        Err(Self::error("stall-service"))
    }
}

#[async_trait]
impl BookingCalendar for Unreachable {
    async fn is_stall_free(
        &self,
        _stall: StallId,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<bool, PortError> {
        Err(Self::error("reservation-service"))
    }
}
