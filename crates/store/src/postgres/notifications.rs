use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;

use super::{PostgresStore, parse_column};
use crate::{
    NewNotification, NotificationQuery, NotificationRecord, NotificationStats,
    NotificationStatus, NotificationStore, Result, StoreError,
};

const NOTIFICATION_COLUMNS: &str = "id, recipient_email, recipient_name, notification_type, \
     subject, message, status, error_message, created_at, sent_at, reference_id";

fn row_to_notification(row: PgRow) -> Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.try_get("id")?,
        recipient_email: row.try_get("recipient_email")?,
        recipient_name: row.try_get("recipient_name")?,
        notification_type: parse_column(&row, "notification_type")?,
        subject: row.try_get("subject")?,
        message: row.try_get("message")?,
        status: parse_column(&row, "status")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        sent_at: row.try_get("sent_at")?,
        reference_id: row.try_get("reference_id")?,
    })
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn insert_notification(&self, new: NewNotification) -> Result<NotificationRecord> {
        let sql = format!(
            r#"
            INSERT INTO notification_logs (recipient_email, recipient_name, notification_type,
                                           subject, status, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&new.recipient_email)
            .bind(&new.recipient_name)
            .bind(new.notification_type.as_str())
            .bind(&new.subject)
            .bind(NotificationStatus::Pending.as_str())
            .bind(&new.reference_id)
            .fetch_one(&self.pool)
            .await?;
        row_to_notification(row)
    }

    async fn update_notification(
        &self,
        record: NotificationRecord,
    ) -> Result<NotificationRecord> {
        let sql = format!(
            r#"
            UPDATE notification_logs
            SET status = $2, message = $3, error_message = $4, sent_at = $5
            WHERE id = $1
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(record.id)
            .bind(record.status.as_str())
            .bind(&record.message)
            .bind(&record.error_message)
            .bind(record.sent_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("Notification", record.id))?;
        row_to_notification(row)
    }

    async fn find_notification(&self, id: i64) -> Result<Option<NotificationRecord>> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notification_logs WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_notification).transpose()
    }

    async fn query_notifications(
        &self,
        query: NotificationQuery,
    ) -> Result<Vec<NotificationRecord>> {
        let mut sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notification_logs WHERE 1=1");
        let mut param_count = 0;

        if query.recipient_email.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND recipient_email = ${param_count}"));
        }
        if query.notification_type.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND notification_type = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(email) = query.recipient_email {
            sqlx_query = sqlx_query.bind(email);
        }
        if let Some(kind) = query.notification_type {
            sqlx_query = sqlx_query.bind(kind.as_str());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(from) = query.from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_notification).collect()
    }

    async fn notification_stats(&self) -> Result<NotificationStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'SENT') AS sent,
                COUNT(*) FILTER (WHERE status = 'FAILED') AS failed,
                COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE notification_type = 'RESERVATION_CONFIRMATION') AS reservations,
                COUNT(*) FILTER (WHERE notification_type = 'REGISTRATION_CONFIRMATION') AS registrations
            FROM notification_logs
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(NotificationStats {
            total: row.try_get("total")?,
            sent: row.try_get("sent")?,
            failed: row.try_get("failed")?,
            pending: row.try_get("pending")?,
            reservations: row.try_get("reservations")?,
            registrations: row.try_get("registrations")?,
        })
    }
}
