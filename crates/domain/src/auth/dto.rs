use chrono::{DateTime, Utc};
use common::{Role, UserId};
use serde::{Deserialize, Serialize};
use store::UserRecord;
use validator::Validate;

fn default_role() -> String {
    Role::Vendor.as_str().to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub contact_number: Option<String>,
    pub owner: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub literary_genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Public view of an account. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub contact_number: Option<String>,
    pub owner: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            full_name: user.full_name,
            phone_number: user.phone_number,
            company_name: user.company_name,
            contact_number: user.contact_number,
            owner: user.owner,
            business_reg_no: user.business_reg_no,
            address: user.address,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllUsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
}
