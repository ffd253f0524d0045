//! Database helpers for the users table.
//!
//! Sessions reference users by id; these helpers cover the user-side reads
//! and writes the auth and self-service flows need.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Minimal user fields the auth flows need.
pub(crate) struct UserRow {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) active: bool,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRow {
    UserRow {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        active: row.get("active"),
    }
}

pub(crate) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
    let query = "SELECT id, email, password_hash, active FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(crate) async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRow>> {
    let query = "SELECT id, email, password_hash, active FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Replace the stored hash; returns false when the user does not exist.
pub(crate) async fn update_password_hash(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<bool> {
    let query = "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    Ok(result.rows_affected() > 0)
}

/// Remove the user row. Session rows must be revoked first; the foreign key
/// has no cascade so a stray live session fails loudly instead of silently
/// outliving its account.
pub(crate) async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;

    Ok(result.rows_affected() > 0)
}
