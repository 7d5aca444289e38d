//! Vendor profiles.

mod dto;
mod service;

use common::UserId;
use thiserror::Error;

pub use dto::{
    CreateProfileRequest, GenresRequest, RichProfileRequest, UpdateProfileRequest,
    VendorDashboard,
};
pub use service::ProfileService;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("User not found: {0}")]
    NotFound(UserId),

    #[error("Profile already exists for user: {0}")]
    AlreadyExists(UserId),

    #[error("{0}")]
    InvalidRole(String),
}
