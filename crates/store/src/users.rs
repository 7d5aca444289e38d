//! User accounts owned by the auth service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Role, UserId};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    /// Argon2 PHC string, never the plaintext.
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub contact_number: Option<String>,
    pub owner: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a user that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub contact_number: Option<String>,
    pub owner: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user. Fails with `Conflict` if the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>>;

    /// All users ordered by id.
    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Returns false if no such user existed.
    async fn delete_user(&self, id: UserId) -> Result<bool>;
}
