use chrono::{DateTime, Utc};
use common::{Money, StallId};
use serde::{Deserialize, Serialize};
use store::{StallRecord, StallSize, StallStatus};
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStallRequest {
    #[validate(custom(function = "not_blank", message = "Stall code is required"))]
    pub stall_code: String,
    #[validate(custom(function = "not_blank", message = "Stall name is required"))]
    pub name: String,
    #[validate(required(message = "Stall size is required"))]
    pub size: Option<StallSize>,
    pub section: Option<String>,
    #[validate(range(min = 1, message = "Row must be positive"))]
    pub row: Option<i32>,
    #[validate(range(min = 1, message = "Column must be positive"))]
    pub column: Option<i32>,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub width: Option<f64>,
    pub length: Option<f64>,
    #[validate(range(min = 1, message = "Price per day must be positive"))]
    pub price_per_day_cents: i64,
    pub description: Option<String>,
}

/// Partial update. Code and status are changed through their own operations.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateStallRequest {
    pub name: Option<String>,
    pub size: Option<StallSize>,
    pub section: Option<String>,
    #[validate(range(min = 1, message = "Row must be positive"))]
    pub row: Option<i32>,
    #[validate(range(min = 1, message = "Column must be positive"))]
    pub column: Option<i32>,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub width: Option<f64>,
    pub length: Option<f64>,
    #[validate(range(min = 1, message = "Price per day must be positive"))]
    pub price_per_day_cents: Option<i64>,
    pub description: Option<String>,
}

impl UpdateStallRequest {
    pub(super) fn apply(self, stall: &mut StallRecord) {
        if let Some(name) = self.name.filter(|n| !n.trim().is_empty()) {
            stall.name = name;
        }
        if let Some(size) = self.size {
            stall.size = size;
        }
        if let Some(cents) = self.price_per_day_cents {
            stall.price_per_day = Money::from_cents(cents);
        }
        stall.section = self.section.or(stall.section.take());
        stall.row = self.row.or(stall.row);
        stall.column = self.column.or(stall.column);
        stall.x_position = self.x_position.or(stall.x_position);
        stall.y_position = self.y_position.or(stall.y_position);
        stall.width = self.width.or(stall.width);
        stall.length = self.length.or(stall.length);
        stall.description = self.description.or(stall.description.take());
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Stall as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallResponse {
    pub id: StallId,
    pub stall_code: String,
    pub name: String,
    pub size: StallSize,
    pub status: StallStatus,
    pub available: bool,
    pub section: Option<String>,
    pub row: Option<i32>,
    pub column: Option<i32>,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub width: Option<f64>,
    pub length: Option<f64>,
    pub price_per_day_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StallRecord> for StallResponse {
    fn from(stall: StallRecord) -> Self {
        Self {
            available: stall.is_available(),
            id: stall.id,
            stall_code: stall.stall_code,
            name: stall.name,
            size: stall.size,
            status: stall.status,
            section: stall.section,
            row: stall.row,
            column: stall.column,
            x_position: stall.x_position,
            y_position: stall.y_position,
            width: stall.width,
            length: stall.length,
            price_per_day_cents: stall.price_per_day.cents(),
            description: stall.description,
            created_at: stall.created_at,
            updated_at: stall.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub stall_code: Option<String>,
    pub available: bool,
    pub message: String,
}

impl AvailabilityResponse {
    pub fn not_found(stall_code: Option<String>) -> Self {
        Self {
            stall_code,
            available: false,
            message: "Stall not found".to_string(),
        }
    }

    /// Availability judged from the stall's status alone.
    pub fn from_status(stall: &StallRecord) -> Self {
        let message = if stall.is_available() {
            "Stall is available".to_string()
        } else {
            format!("Stall is {}", stall.status.as_str().to_lowercase())
        };
        Self {
            stall_code: Some(stall.stall_code.clone()),
            available: stall.is_available(),
            message,
        }
    }
}
