//! In-memory token store for local development and tests.

use super::{InsertOutcome, TokenRecord, TokenStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Digest-keyed map behind one async mutex; plenty for the volumes a dev
/// instance or a test sees.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    rows: Mutex<HashMap<Vec<u8>, TokenRecord>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held, live or stale.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(
        &self,
        id: Uuid,
        token_hash: &[u8],
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(token_hash) {
            return Ok(InsertOutcome::Duplicate);
        }
        rows.insert(
            token_hash.to_vec(),
            TokenRecord {
                id,
                user_id,
                last_used_at: now,
            },
        );
        Ok(InsertOutcome::Inserted)
    }

    async fn find_live(
        &self,
        token_hash: &[u8],
        cutoff: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(token_hash)
            .filter(|row| row.last_used_at > cutoff)
            .cloned())
    }

    async fn touch(&self, token_hash: &[u8], now: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.get_mut(token_hash) {
            row.last_used_at = now;
        }
        Ok(())
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        self.rows.lock().await.remove(token_hash);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, row| row.user_id != user_id);
        Ok(u64::try_from(before - rows.len()).unwrap_or(0))
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, row| row.last_used_at > cutoff);
        Ok(u64::try_from(before - rows.len()).unwrap_or(0))
    }

    async fn find(&self, token_hash: &[u8]) -> Result<Option<TokenRecord>> {
        Ok(self.rows.lock().await.get(token_hash).cloned())
    }
}
