use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use common::{StallId, UserId};
use serde::{Deserialize, Serialize};
use store::{PaymentStatus, ReservationRecord, ReservationStatus};
use validator::{Validate, ValidationError};

/// Most stalls a single booking may cover.
pub const MAX_STALLS_PER_BOOKING: usize = 3;

fn stall_selection(stall_ids: &[StallId]) -> Result<(), ValidationError> {
    let error = |code: &'static str, message: &'static str| {
        Err(ValidationError::new(code).with_message(message.into()))
    };

    if stall_ids.is_empty() {
        return error("empty", "At least one stall must be selected");
    }
    if stall_ids.len() > MAX_STALLS_PER_BOOKING {
        return error("too_many", "Maximum 3 stalls can be reserved per booking");
    }
    let unique: HashSet<_> = stall_ids.iter().collect();
    if unique.len() != stall_ids.len() {
        return error("duplicate", "The same stall cannot be selected twice");
    }
    Ok(())
}

fn in_future(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        Ok(())
    } else {
        Err(ValidationError::new("future"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservationRequest {
    #[validate(custom(function = "stall_selection"))]
    pub stall_ids: Vec<StallId>,
    #[validate(custom(function = "in_future", message = "Start date must be in the future"))]
    pub start_date: NaiveDate,
    #[validate(custom(function = "in_future", message = "End date must be in the future"))]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub genres: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenresUpdateRequest {
    pub genres: Vec<String>,
}

/// Reservation as returned by the API. The QR image path stays internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: i64,
    pub user_id: UserId,
    pub user_email: String,
    pub company_name: Option<String>,
    pub stall_ids: Vec<StallId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub total_price_cents: i64,
    pub qr_code: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl From<ReservationRecord> for ReservationResponse {
    fn from(r: ReservationRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            user_email: r.user_email,
            company_name: r.company_name,
            stall_ids: r.stall_ids,
            start_date: r.start_date,
            end_date: r.end_date,
            status: r.status,
            payment_status: r.payment_status,
            total_price_cents: r.total_price.cents(),
            qr_code: r.qr_code,
            genres: r.genres,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
            confirmed_at: r.confirmed_at,
            cancelled_at: r.cancelled_at,
            cancellation_reason: r.cancellation_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCodeResponse {
    pub qr_code: String,
    pub qr_code_image: String,
    pub download_url: String,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::validation_message;

    fn request(stalls: Vec<StallId>, start_in: i64, end_in: i64) -> CreateReservationRequest {
        let today = Utc::now().date_naive();
        CreateReservationRequest {
            stall_ids: stalls,
            start_date: today + Duration::days(start_in),
            end_date: today + Duration::days(end_in),
            genres: vec![],
            notes: None,
        }
    }

    fn message(request: &CreateReservationRequest) -> String {
        validation_message(&request.validate().unwrap_err())
    }

    #[test]
    fn accepts_valid_selection() {
        assert!(request(vec![StallId::new()], 1, 2).validate().is_ok());
    }

    #[test]
    fn rejects_empty_and_oversized_selection() {
        assert_eq!(
            message(&request(vec![], 1, 2)),
            "At least one stall must be selected"
        );
        let four = (0..4).map(|_| StallId::new()).collect();
        assert_eq!(
            message(&request(four, 1, 2)),
            "Maximum 3 stalls can be reserved per booking"
        );
    }

    #[test]
    fn rejects_duplicate_stalls() {
        let stall = StallId::new();
        assert_eq!(
            message(&request(vec![stall, stall], 1, 2)),
            "The same stall cannot be selected twice"
        );
    }

    #[test]
    fn dates_must_be_after_today() {
        assert_eq!(
            message(&request(vec![StallId::new()], 0, 2)),
            "Start date must be in the future"
        );
        assert_eq!(
            message(&request(vec![StallId::new()], -3, -1)),
            "End date must be in the future, Start date must be in the future"
        );
    }
}
