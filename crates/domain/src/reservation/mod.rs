//! Stall reservations.

mod dto;
mod service;

use common::StallId;
use thiserror::Error;

pub use dto::{
    CancelRequest, CreateReservationRequest, GenresUpdateRequest, QrCodeResponse,
    ReservationResponse,
};
pub use service::{QrDownload, ReservationService};

/// Booking and QR code failures.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Also returned when the reservation belongs to someone else.
    #[error("Reservation not found with ID: {0}")]
    NotFound(i64),

    #[error("Cannot reserve more than {max} stalls. You currently have {current} stalls reserved.")]
    LimitExceeded { max: i64, current: i64 },

    #[error("Stall {0} is not available for the selected dates")]
    StallNotAvailable(StallId),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    QrNotFound(String),
}
