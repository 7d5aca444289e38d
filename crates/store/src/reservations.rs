//! Reservations owned by the reservation service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{Money, StallId, UserId};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }

    /// Active reservations hold their stalls and count toward the user's limit.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    pub const ACTIVE: [ReservationStatus; 2] =
        [ReservationStatus::Pending, ReservationStatus::Confirmed];
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            "FAILED" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {s}")),
        }
    }
}

/// A stored reservation. Dates are inclusive calendar days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: i64,
    pub user_id: UserId,
    pub user_email: String,
    pub company_name: Option<String>,
    pub stall_ids: Vec<StallId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub total_price: Money,
    pub qr_code: Option<String>,
    pub qr_code_path: Option<String>,
    pub genres: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl ReservationRecord {
    /// Whether this reservation blocks `stall` during `[start, end]`.
    pub fn blocks(&self, stall: StallId, start: NaiveDate, end: NaiveDate) -> bool {
        self.status.is_active()
            && self.stall_ids.contains(&stall)
            && ranges_overlap(self.start_date, self.end_date, start, end)
    }
}

/// Closed-interval overlap. Touching endpoints count as overlapping.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// A reservation about to be inserted with status and payment PENDING.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub user_id: UserId,
    pub user_email: String,
    pub company_name: Option<String>,
    pub stall_ids: Vec<StallId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: Money,
    pub genres: Vec<String>,
    pub notes: Option<String>,
}

/// Result of the atomic check-and-insert.
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    Created(ReservationRecord),
    /// Inserting would push the user past their limit.
    LimitExceeded { current: i64 },
    /// The stall is held by an overlapping active reservation.
    StallTaken(StallId),
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Re-checks the stall limit and every stall's availability, then
    /// inserts, all without interleaving with other `reserve` calls that
    /// touch the same user or any of the same stalls.
    async fn reserve(
        &self,
        new: NewReservation,
        max_stalls_per_user: i64,
    ) -> Result<ReserveOutcome>;

    async fn find_reservation(&self, id: i64) -> Result<Option<ReservationRecord>>;

    async fn find_reservation_by_qr_code(&self, code: &str)
    -> Result<Option<ReservationRecord>>;

    /// Newest first.
    async fn list_reservations_for_user(&self, user_id: UserId)
    -> Result<Vec<ReservationRecord>>;

    /// Newest first.
    async fn list_reservations_for_stall(
        &self,
        stall_id: StallId,
    ) -> Result<Vec<ReservationRecord>>;

    /// Newest first, optionally restricted to one status.
    async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationRecord>>;

    /// Sum of stall counts over the user's active reservations.
    async fn count_active_stalls(&self, user_id: UserId) -> Result<i64>;

    /// Active reservations holding `stall_id` on any day of `[start, end]`.
    async fn count_overlapping(
        &self,
        stall_id: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64>;

    /// Overwrites every mutable column, but only while the stored status is
    /// still `expected`. A different status fails with `ConcurrencyConflict`
    /// and leaves the row untouched. Fails with `NotFound` if absent.
    async fn update_reservation(
        &self,
        reservation: ReservationRecord,
        expected: ReservationStatus,
    ) -> Result<ReservationRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, day).unwrap()
    }

    #[test]
    fn overlap_is_closed_interval() {
        assert!(ranges_overlap(d(1), d(5), d(5), d(9)));
        assert!(ranges_overlap(d(3), d(4), d(1), d(9)));
        assert!(ranges_overlap(d(1), d(1), d(1), d(1)));
        assert!(!ranges_overlap(d(1), d(4), d(5), d(9)));
        assert!(!ranges_overlap(d(6), d(9), d(1), d(5)));
    }

    #[test]
    fn only_active_statuses_are_active() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::Confirmed.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
        assert!(!ReservationStatus::Completed.is_active());
    }

    #[test]
    fn status_parse_reports_input() {
        assert_eq!(
            "confirmed".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Confirmed
        );
        assert_eq!(
            "bogus".parse::<ReservationStatus>().unwrap_err(),
            "Invalid status: bogus"
        );
    }
}
