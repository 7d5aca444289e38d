use async_trait::async_trait;
use common::UserId;
use sqlx::Row;
use sqlx::postgres::PgRow;

use super::{PostgresStore, conflict_on, parse_column};
use crate::{NewUser, Result, UserRecord, UserStore};

const USER_COLUMNS: &str = "id, email, password_hash, role, full_name, phone_number, \
     company_name, contact_number, owner, business_reg_no, address, created_at, updated_at";

fn row_to_user(row: PgRow) -> Result<UserRecord> {
    Ok(UserRecord {
        id: UserId::new(row.try_get("id")?),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: parse_column(&row, "role")?,
        full_name: row.try_get("full_name")?,
        phone_number: row.try_get("phone_number")?,
        company_name: row.try_get("company_name")?,
        contact_number: row.try_get("contact_number")?,
        owner: row.try_get("owner")?,
        business_reg_no: row.try_get("business_reg_no")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, role, full_name, phone_number,
                               company_name, contact_number, owner, business_reg_no, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.full_name)
            .bind(&user.phone_number)
            .bind(&user.company_name)
            .bind(&user.contact_number)
            .bind(&user.owner)
            .bind(&user.business_reg_no)
            .bind(&user.address)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on(
                "unique_user_email",
                format!("email {} already registered", user.email),
            ))?;
        row_to_user(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_user).collect()
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
