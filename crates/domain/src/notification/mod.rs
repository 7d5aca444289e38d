//! Event intake, email rendering and the delivery log.

mod dto;
mod queue;
mod service;
pub mod templates;

use thiserror::Error;

pub use dto::NotificationRequest;
pub use queue::{NotificationJob, NotificationQueue, NotificationWorker};
pub use service::NotificationService;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found with ID: {0}")]
    NotFound(i64),

    #[error("Recipient email is required")]
    MissingRecipient,

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Either a message or a template name is required")]
    EmptyBody,

    /// The dispatcher has shut down.
    #[error("Notification queue is closed")]
    QueueClosed,
}
