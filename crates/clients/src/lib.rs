//! Outbound adapters used when services run as separate processes.
//!
//! Every HTTP adapter wraps a [`ServiceClient`] pointed at one peer and
//! implements one of the `domain::ports` traits. Peers answer either a bare
//! JSON body or the `{success, data, error}` envelope; both are handled here
//! so the domain only ever sees [`PortError`](domain::ports::PortError).

mod directory;
mod error;
mod http;
mod mail;
mod notify;
mod stalls;

pub use directory::{HttpAccountDirectory, HttpProfileDirectory, HttpReservationDirectory};
pub use error::ClientError;
pub use http::{DEFAULT_TIMEOUT, ServiceClient, build_http_client};
pub use mail::{SmtpConfig, SmtpMailer};
pub use notify::HttpNotificationPublisher;
pub use stalls::{HttpBookingCalendar, HttpStallCatalog};
