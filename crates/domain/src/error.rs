//! Domain error types.

use store::StoreError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::notification::NotificationError;
use crate::profile::ProfileError;
use crate::reservation::ReservationError;
use crate::stall::StallError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Stall(#[from] StallError),

    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Request failed field validation.
    #[error("{0}")]
    Validation(String),

    /// The caller lacks the role the operation requires.
    #[error("{0}")]
    Forbidden(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn admin_required() -> Self {
        DomainError::Forbidden("Admin access required".to_string())
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        DomainError::Validation(validation_message(&errors))
    }
}

/// Flattens field errors into one sorted, comma-separated message.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
