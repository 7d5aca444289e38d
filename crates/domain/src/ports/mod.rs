//! Outbound dependencies of the domain services.
//!
//! Every call a service makes to another service goes through one of these
//! traits. The `local` module implements them directly over the stores for
//! single-process deployments, and the `clients` crate implements them
//! over HTTP and SMTP.

mod directory;
pub mod local;
mod mail;
mod notify;
mod stalls;

use thiserror::Error;

pub use directory::{AccountDirectory, ProfileDirectory, ReservationDirectory};
pub use mail::{InMemoryMailer, LogMailer, Mailer, OutgoingEmail};
pub use notify::{NotificationPublisher, PublishedEvent, RecordingPublisher};
pub use stalls::{BookingCalendar, StallCatalog, StallSummary};

/// Failure talking to another service.
#[derive(Debug, Error)]
pub enum PortError {
    /// The service could not be reached or timed out.
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The response body could not be understood.
    #[error("{service} sent an unreadable response: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },
}

impl PortError {
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        PortError::Unavailable {
            service,
            reason: reason.into(),
        }
    }
}

/// A dependency that is always down. Used to exercise degraded paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unreachable;

impl Unreachable {
    fn error(service: &'static str) -> PortError {
        PortError::unavailable(service, "connection refused")
    }
}
