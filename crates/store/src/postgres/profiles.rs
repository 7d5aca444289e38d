use async_trait::async_trait;
use common::UserId;
use sqlx::Row;
use sqlx::postgres::PgRow;

use super::{PostgresStore, conflict_on, parse_column};
use crate::{NewProfile, ProfileRecord, ProfileStore, Result, StoreError};

const PROFILE_COLUMNS: &str = "id, user_id, full_name, email, phone_number, company_name, \
     business_reg_no, address, literary_genres, role, business_description, profile_image_url, \
     website_url, facebook_url, created_at, updated_at";

fn row_to_profile(row: PgRow) -> Result<ProfileRecord> {
    Ok(ProfileRecord {
        id: row.try_get("id")?,
        user_id: UserId::new(row.try_get("user_id")?),
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        company_name: row.try_get("company_name")?,
        business_reg_no: row.try_get("business_reg_no")?,
        address: row.try_get("address")?,
        literary_genres: row.try_get("literary_genres")?,
        role: parse_column(&row, "role")?,
        business_description: row.try_get("business_description")?,
        profile_image_url: row.try_get("profile_image_url")?,
        website_url: row.try_get("website_url")?,
        facebook_url: row.try_get("facebook_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord> {
        let sql = format!(
            r#"
            INSERT INTO profiles (user_id, full_name, email, phone_number, company_name,
                                  business_reg_no, address, literary_genres, role,
                                  business_description, profile_image_url, website_url,
                                  facebook_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(profile.user_id.as_i64())
            .bind(&profile.full_name)
            .bind(&profile.email)
            .bind(&profile.phone_number)
            .bind(&profile.company_name)
            .bind(&profile.business_reg_no)
            .bind(&profile.address)
            .bind(&profile.literary_genres)
            .bind(profile.role.as_str())
            .bind(&profile.business_description)
            .bind(&profile.profile_image_url)
            .bind(&profile.website_url)
            .bind(&profile.facebook_url)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on(
                "unique_profile_user",
                format!("profile for user {} already exists", profile.user_id),
            ))?;
        row_to_profile(row)
    }

    async fn find_profile(&self, user_id: UserId) -> Result<Option<ProfileRecord>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_profile).transpose()
    }

    async fn update_profile(&self, profile: ProfileRecord) -> Result<ProfileRecord> {
        let sql = format!(
            r#"
            UPDATE profiles
            SET full_name = $2, email = $3, phone_number = $4, company_name = $5,
                business_reg_no = $6, address = $7, literary_genres = $8, role = $9,
                business_description = $10, profile_image_url = $11, website_url = $12,
                facebook_url = $13, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(profile.user_id.as_i64())
            .bind(&profile.full_name)
            .bind(&profile.email)
            .bind(&profile.phone_number)
            .bind(&profile.company_name)
            .bind(&profile.business_reg_no)
            .bind(&profile.address)
            .bind(&profile.literary_genres)
            .bind(profile.role.as_str())
            .bind(&profile.business_description)
            .bind(&profile.profile_image_url)
            .bind(&profile.website_url)
            .bind(&profile.facebook_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Profile", profile.user_id))?;
        row_to_profile(row)
    }

    async fn delete_profile(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_profiles_by_genre(&self, genre: &str) -> Result<Vec<ProfileRecord>> {
        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS} FROM profiles
            WHERE EXISTS (SELECT 1 FROM unnest(literary_genres) g WHERE lower(g) = lower($1))
            ORDER BY id
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(genre)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_profile).collect()
    }
}
