//! Events published to the notification service.
//!
//! Field names are snake_case on the wire so existing producers and
//! consumers keep working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stall line inside a [`ReservationEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallInfo {
    pub stall_id: String,
    pub stall_name: String,
    pub stall_size: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Price per day in cents.
    pub price_cents: i64,
}

/// Emitted once a reservation is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationEvent {
    pub reservation_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    pub stalls: Vec<StallInfo>,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub reservation_date: DateTime<Utc>,
    pub total_amount_cents: i64,
    #[serde(default)]
    pub qr_code: Option<String>,
}

/// Emitted after a user account is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationEvent {
    pub user_id: String,
    pub email: String,
    pub user_name: String,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub registration_date: DateTime<Utc>,
    #[serde(default)]
    pub temporary_password: Option<String>,
}

/// Emitted when a reservation is cancelled by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationEvent {
    pub reservation_id: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_event_accepts_minimal_payload() {
        let json = serde_json::json!({
            "user_id": "7",
            "email": "v@example.com",
            "user_name": "Vendor",
            "registration_date": "2026-03-01T10:00:00Z"
        });
        let event: RegistrationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.user_id, "7");
        assert!(event.business_name.is_none());
        assert!(event.temporary_password.is_none());
    }
}
