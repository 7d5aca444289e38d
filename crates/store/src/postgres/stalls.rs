use async_trait::async_trait;
use common::{Money, StallId};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::{PostgresStore, conflict_on, parse_column};
use crate::{Result, StallFilter, StallRecord, StallStore, StoreError};

const STALL_COLUMNS: &str = "id, stall_code, name, size, status, section, row_number, \
     column_number, x_position, y_position, width, length, price_per_day_cents, description, \
     created_at, updated_at";

fn row_to_stall(row: PgRow) -> Result<StallRecord> {
    Ok(StallRecord {
        id: StallId::from_uuid(row.try_get::<Uuid, _>("id")?),
        stall_code: row.try_get("stall_code")?,
        name: row.try_get("name")?,
        size: parse_column(&row, "size")?,
        status: parse_column(&row, "status")?,
        section: row.try_get("section")?,
        row: row.try_get("row_number")?,
        column: row.try_get("column_number")?,
        x_position: row.try_get("x_position")?,
        y_position: row.try_get("y_position")?,
        width: row.try_get("width")?,
        length: row.try_get("length")?,
        price_per_day: Money::from_cents(row.try_get("price_per_day_cents")?),
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl StallStore for PostgresStore {
    async fn insert_stall(&self, stall: StallRecord) -> Result<StallRecord> {
        let sql = format!(
            r#"
            INSERT INTO stalls (id, stall_code, name, size, status, section, row_number,
                                column_number, x_position, y_position, width, length,
                                price_per_day_cents, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {STALL_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(stall.id.as_uuid())
            .bind(&stall.stall_code)
            .bind(&stall.name)
            .bind(stall.size.as_str())
            .bind(stall.status.as_str())
            .bind(&stall.section)
            .bind(stall.row)
            .bind(stall.column)
            .bind(stall.x_position)
            .bind(stall.y_position)
            .bind(stall.width)
            .bind(stall.length)
            .bind(stall.price_per_day.cents())
            .bind(&stall.description)
            .bind(stall.created_at)
            .bind(stall.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on(
                "unique_stall_code",
                format!("stall code {} already exists", stall.stall_code),
            ))?;
        row_to_stall(row)
    }

    async fn find_stall(&self, id: StallId) -> Result<Option<StallRecord>> {
        let sql = format!("SELECT {STALL_COLUMNS} FROM stalls WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_stall).transpose()
    }

    async fn find_stall_by_code(&self, code: &str) -> Result<Option<StallRecord>> {
        let sql = format!("SELECT {STALL_COLUMNS} FROM stalls WHERE stall_code = $1");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_stall).transpose()
    }

    async fn list_stalls(&self, filter: StallFilter) -> Result<Vec<StallRecord>> {
        let mut sql = format!("SELECT {STALL_COLUMNS} FROM stalls WHERE 1=1");
        let mut param_count = 0;

        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.size.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND size = ${param_count}"));
        }
        if filter.section.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND section = ${param_count}"));
        }
        sql.push_str(" ORDER BY stall_code ASC");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(size) = filter.size {
            query = query.bind(size.as_str());
        }
        if let Some(section) = filter.section {
            query = query.bind(section);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_stall).collect()
    }

    async fn update_stall(&self, stall: StallRecord) -> Result<StallRecord> {
        let sql = format!(
            r#"
            UPDATE stalls
            SET name = $2, size = $3, status = $4, section = $5, row_number = $6,
                column_number = $7, x_position = $8, y_position = $9, width = $10,
                length = $11, price_per_day_cents = $12, description = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING {STALL_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(stall.id.as_uuid())
            .bind(&stall.name)
            .bind(stall.size.as_str())
            .bind(stall.status.as_str())
            .bind(&stall.section)
            .bind(stall.row)
            .bind(stall.column)
            .bind(stall.x_position)
            .bind(stall.y_position)
            .bind(stall.width)
            .bind(stall.length)
            .bind(stall.price_per_day.cents())
            .bind(&stall.description)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Stall", stall.id))?;
        row_to_stall(row)
    }

    async fn delete_stall(&self, id: StallId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM stalls WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
