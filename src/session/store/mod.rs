//! Persistence for issued tokens.
//!
//! The trait exposes storage primitives only; window arithmetic stays with
//! the caller. Every operation takes its timestamps as parameters, which
//! keeps the Postgres and in-memory backends interchangeable and lets tests
//! drive expiry with a simulated clock.

mod memory;
mod postgres;

pub use memory::MemoryTokenStore;
pub use postgres::PgTokenStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One persisted token: surrogate id, owner, and the sliding-window anchor.
///
/// The raw token value never appears here; rows are keyed by its digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub last_used_at: DateTime<Utc>,
}

/// Result of inserting a token digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The digest already exists; the caller should generate a new value.
    Duplicate,
}

/// Storage primitives for the token lifecycle.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new row. A digest collision reports [`InsertOutcome::Duplicate`]
    /// instead of an error so the caller can retry with a fresh value.
    async fn insert(
        &self,
        id: Uuid,
        token_hash: &[u8],
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome>;

    /// Constrained read: only rows with `last_used_at > cutoff` are returned.
    async fn find_live(
        &self,
        token_hash: &[u8],
        cutoff: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>>;

    /// Move the window anchor to `now`. Zero rows updated is not an error.
    async fn touch(&self, token_hash: &[u8], now: DateTime<Utc>) -> Result<()>;

    /// Delete one row by digest; absent rows are fine.
    async fn delete(&self, token_hash: &[u8]) -> Result<()>;

    /// Delete every row owned by `user_id`, returning the number removed.
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64>;

    /// One set-based delete of every row at or behind the cutoff.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Raw read without the liveness constraint; diagnostics and tests only.
    async fn find(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>>;
}
