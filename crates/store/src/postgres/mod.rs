//! PostgreSQL-backed store.

mod notifications;
mod profiles;
mod reservations;
mod stalls;
mod users;

use std::str::FromStr;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::{Result, StoreError};

/// PostgreSQL-backed store implementing every store trait.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to connect to PostgreSQL"))?;
        tracing::info!(max_connections, "PostgreSQL pool opened");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        let migrator = sqlx::migrate!("../../migrations");
        tracing::debug!(count = migrator.iter().count(), "Running migrations");
        migrator.run(&self.pool).await?;
        tracing::info!("Migrations applied");
        Ok(())
    }
}

/// Reads a text column and parses it into an enum.
fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{column}: {e}")))
}

/// Maps a unique violation on `constraint` to `Conflict`.
fn conflict_on(
    constraint: &'static str,
    message: String,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.constraint() == Some(constraint)
        {
            return StoreError::Conflict(message);
        }
        StoreError::Database(e)
    }
}
