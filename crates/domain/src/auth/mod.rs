//! Accounts, login and token issuance.

mod dto;
mod service;

use common::{JwtError, UserId};
use thiserror::Error;

pub use dto::{
    AllUsersResponse, DeleteUserResponse, LoginRequest, LoginResponse, RegisterRequest,
    RegisterResponse, UserResponse,
};
pub use service::AuthService;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with ID {0} does not exist")]
    UserNotFound(UserId),

    #[error("User not found with email: {0}")]
    EmailNotFound(String),

    #[error("No token provided.")]
    NoToken,

    #[error("{0}")]
    InvalidRole(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Token(#[from] JwtError),
}
