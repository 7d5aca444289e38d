//! Vendor profiles owned by the profile service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Role, UserId};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: i64,
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub literary_genres: Vec<String>,
    pub role: Role,
    pub business_description: Option<String>,
    pub profile_image_url: Option<String>,
    pub website_url: Option<String>,
    pub facebook_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// True if any genre matches, ignoring case.
    pub fn has_genre(&self, genre: &str) -> bool {
        self.literary_genres
            .iter()
            .any(|g| g.eq_ignore_ascii_case(genre))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub literary_genres: Vec<String>,
    pub role: Role,
    pub business_description: Option<String>,
    pub profile_image_url: Option<String>,
    pub website_url: Option<String>,
    pub facebook_url: Option<String>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fails with `Conflict` if the user already has a profile.
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord>;

    async fn find_profile(&self, user_id: UserId) -> Result<Option<ProfileRecord>>;

    /// Overwrites every mutable column. Fails with `NotFound` if absent.
    async fn update_profile(&self, profile: ProfileRecord) -> Result<ProfileRecord>;

    async fn delete_profile(&self, user_id: UserId) -> Result<bool>;

    /// Profiles listing the genre, compared case-insensitively.
    async fn search_profiles_by_genre(&self, genre: &str) -> Result<Vec<ProfileRecord>>;
}
