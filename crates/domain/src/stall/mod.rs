//! Stall inventory.

mod dto;
mod service;

use common::StallId;
use thiserror::Error;

pub use dto::{
    AvailabilityResponse, CreateStallRequest, StallResponse, StatusUpdateRequest,
    UpdateStallRequest,
};
pub use service::StallService;

#[derive(Debug, Error)]
pub enum StallError {
    #[error("Stall not found with id: {0}")]
    NotFound(StallId),

    #[error("Stall not found with code: {0}")]
    CodeNotFound(String),

    #[error("Stall with code '{0}' already exists")]
    DuplicateCode(String),

    #[error("{0}")]
    InvalidValue(String),
}
