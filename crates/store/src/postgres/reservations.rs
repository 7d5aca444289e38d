use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Money, StallId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use super::{PostgresStore, conflict_on, parse_column};
use crate::{
    NewReservation, PaymentStatus, ReservationRecord, ReservationStatus, ReservationStore,
    ReserveOutcome, Result, StoreError,
};

const RESERVATION_COLUMNS: &str = "id, user_id, user_email, company_name, stall_ids, \
     start_date, end_date, status, payment_status, total_price_cents, qr_code, qr_code_path, \
     genres, notes, created_at, updated_at, confirmed_at, cancelled_at, cancellation_reason";

const ACTIVE: &str = "status IN ('PENDING', 'CONFIRMED')";

fn row_to_reservation(row: PgRow) -> Result<ReservationRecord> {
    let stall_ids: Vec<Uuid> = row.try_get("stall_ids")?;
    Ok(ReservationRecord {
        id: row.try_get("id")?,
        user_id: UserId::new(row.try_get("user_id")?),
        user_email: row.try_get("user_email")?,
        company_name: row.try_get("company_name")?,
        stall_ids: stall_ids.into_iter().map(StallId::from_uuid).collect(),
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: parse_column(&row, "status")?,
        payment_status: parse_column::<PaymentStatus>(&row, "payment_status")?,
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        qr_code: row.try_get("qr_code")?,
        qr_code_path: row.try_get("qr_code_path")?,
        genres: row.try_get("genres")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        confirmed_at: row.try_get("confirmed_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
    })
}

/// Takes transaction-scoped advisory locks on the user and each stall.
///
/// Keys are taken in a fixed order (user, then stalls sorted) so two
/// transactions can never wait on each other in a cycle.
async fn lock_user_and_stalls(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    stall_ids: &[StallId],
) -> Result<()> {
    let mut keys = vec![format!("reservation-user:{user_id}")];
    let mut stalls = stall_ids.to_vec();
    stalls.sort();
    keys.extend(stalls.iter().map(|s| format!("reservation-stall:{s}")));

    for key in keys {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn reserve(
        &self,
        new: NewReservation,
        max_stalls_per_user: i64,
    ) -> Result<ReserveOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_user_and_stalls(&mut tx, new.user_id, &new.stall_ids).await?;

        let current: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(SUM(cardinality(stall_ids)), 0)::BIGINT FROM reservations \
             WHERE user_id = $1 AND {ACTIVE}"
        ))
        .bind(new.user_id.as_i64())
        .fetch_one(&mut *tx)
        .await?;

        if current + new.stall_ids.len() as i64 > max_stalls_per_user {
            tx.rollback().await?;
            return Ok(ReserveOutcome::LimitExceeded { current });
        }

        for stall in &new.stall_ids {
            let taken: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM reservations WHERE $1 = ANY(stall_ids) AND {ACTIVE} \
                 AND start_date <= $3 AND end_date >= $2"
            ))
            .bind(stall.as_uuid())
            .bind(new.start_date)
            .bind(new.end_date)
            .fetch_one(&mut *tx)
            .await?;

            if taken > 0 {
                tx.rollback().await?;
                return Ok(ReserveOutcome::StallTaken(*stall));
            }
        }

        let stall_uuids: Vec<Uuid> = new.stall_ids.iter().map(StallId::as_uuid).collect();
        let sql = format!(
            r#"
            INSERT INTO reservations (user_id, user_email, company_name, stall_ids, start_date,
                                      end_date, status, payment_status, total_price_cents,
                                      genres, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(new.user_id.as_i64())
            .bind(&new.user_email)
            .bind(&new.company_name)
            .bind(&stall_uuids)
            .bind(new.start_date)
            .bind(new.end_date)
            .bind(ReservationStatus::Pending.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .bind(new.total_price.cents())
            .bind(&new.genres)
            .bind(&new.notes)
            .fetch_one(&mut *tx)
            .await?;
        let record = row_to_reservation(row)?;

        tx.commit().await?;
        Ok(ReserveOutcome::Created(record))
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<ReservationRecord>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_reservation).transpose()
    }

    async fn find_reservation_by_qr_code(
        &self,
        code: &str,
    ) -> Result<Option<ReservationRecord>> {
        let sql = format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE qr_code = $1");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_reservation).transpose()
    }

    async fn list_reservations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReservationRecord>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_reservation).collect()
    }

    async fn list_reservations_for_stall(
        &self,
        stall_id: StallId,
    ) -> Result<Vec<ReservationRecord>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE $1 = ANY(stall_ids) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(stall_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_reservation).collect()
    }

    async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationRecord>> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE status = $1 \
                     ORDER BY created_at DESC, id DESC"
                );
                sqlx::query(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations \
                     ORDER BY created_at DESC, id DESC"
                );
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };
        rows.into_iter().map(row_to_reservation).collect()
    }

    async fn count_active_stalls(&self, user_id: UserId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(SUM(cardinality(stall_ids)), 0)::BIGINT FROM reservations \
             WHERE user_id = $1 AND {ACTIVE}"
        ))
        .bind(user_id.as_i64())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_overlapping(
        &self,
        stall_id: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM reservations WHERE $1 = ANY(stall_ids) AND {ACTIVE} \
             AND start_date <= $3 AND end_date >= $2"
        ))
        .bind(stall_id.as_uuid())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_reservation(
        &self,
        reservation: ReservationRecord,
        expected: ReservationStatus,
    ) -> Result<ReservationRecord> {
        let sql = format!(
            r#"
            UPDATE reservations
            SET status = $2, payment_status = $3, qr_code = $4, qr_code_path = $5,
                genres = $6, notes = $7, confirmed_at = $8, cancelled_at = $9,
                cancellation_reason = $10, updated_at = NOW()
            WHERE id = $1 AND status = $11
            RETURNING {RESERVATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(reservation.id)
            .bind(reservation.status.as_str())
            .bind(reservation.payment_status.as_str())
            .bind(&reservation.qr_code)
            .bind(&reservation.qr_code_path)
            .bind(&reservation.genres)
            .bind(&reservation.notes)
            .bind(reservation.confirmed_at)
            .bind(reservation.cancelled_at)
            .bind(&reservation.cancellation_reason)
            .bind(expected.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conflict_on(
                "unique_reservation_qr_code",
                format!("QR code already issued for reservation {}", reservation.id),
            ))?;

        if let Some(row) = row {
            return row_to_reservation(row);
        }

        // Nothing matched: either the row is gone or its status moved on.
        let actual: Option<String> =
            sqlx::query_scalar("SELECT status FROM reservations WHERE id = $1")
                .bind(reservation.id)
                .fetch_optional(&self.pool)
                .await?;
        match actual {
            Some(actual) => {
                tracing::debug!(
                    id = %reservation.id,
                    %expected,
                    %actual,
                    "Rejected stale reservation write"
                );
                Err(StoreError::ConcurrencyConflict {
                    entity: "Reservation",
                    id: reservation.id.to_string(),
                    expected: expected.to_string(),
                    actual,
                })
            }
            None => Err(StoreError::not_found("Reservation", reservation.id)),
        }
    }
}
