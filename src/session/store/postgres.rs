//! Postgres-backed token store.
//!
//! Rows live in the `sessions` table. Timestamps arrive as bind parameters
//! rather than `NOW()` so the store stays agnostic about where time comes
//! from, and every query runs inside a `db.query` span.

use super::{InsertOutcome, TokenRecord, TokenStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> TokenRecord {
    TokenRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        last_used_at: row.get("last_used_at"),
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(
        &self,
        id: Uuid,
        token_hash: &[u8],
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO sessions (id, token_hash, user_id, last_used_at)
            VALUES ($1, $2, $3, $4)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(token_hash)
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err).context("failed to insert session token"),
        }
    }

    async fn find_live(
        &self,
        token_hash: &[u8],
        cutoff: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        // The liveness constraint lives in the query itself so an expired
        // row can never authenticate, whatever the caller does next.
        let query = r"
            SELECT id, user_id, last_used_at
            FROM sessions
            WHERE token_hash = $1
              AND last_used_at > $2
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(cutoff)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session token")?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn touch(&self, token_hash: &[u8], now: DateTime<Utc>) -> Result<()> {
        let query = r"
            UPDATE sessions
            SET last_used_at = $2
            WHERE token_hash = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to refresh session token")?;

        Ok(())
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session token")?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE user_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user session tokens")?;

        Ok(result.rows_affected())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        // One set-based statement per sweep; no per-row round trips.
        let query = "DELETE FROM sessions WHERE last_used_at <= $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(cutoff)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete stale session tokens")?;

        Ok(result.rows_affected())
    }

    async fn find(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        let query = r"
            SELECT id, user_id, last_used_at
            FROM sessions
            WHERE token_hash = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch session token")?;

        Ok(row.as_ref().map(record_from_row))
    }
}
