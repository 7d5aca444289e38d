//! Business services for the bookfair platform.
//!
//! Each submodule owns one service: request DTOs, its error enum and the
//! service type that validates input, talks to a store, and calls other
//! services through the traits in [`ports`].

pub mod auth;
pub mod caller;
pub mod error;
pub mod events;
pub mod notification;
pub mod password;
pub mod ports;
pub mod profile;
pub mod qr;
pub mod reservation;
pub mod stall;

pub use auth::{AuthError, AuthService};
pub use caller::Caller;
pub use error::{DomainError, validation_message};
pub use events::{CancellationEvent, RegistrationEvent, ReservationEvent, StallInfo};
pub use notification::{
    NotificationError, NotificationJob, NotificationQueue, NotificationService, NotificationWorker,
};
pub use profile::{ProfileError, ProfileService};
pub use qr::{QrCodeGenerator, QrError};
pub use reservation::{ReservationError, ReservationService};
pub use stall::{StallError, StallService};

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
