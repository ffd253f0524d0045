//! Token lifecycle: issue, verify-and-refresh, revoke, sweep.
//!
//! The raw token value exists only in transit. It is handed to the client at
//! issuance and hashed with `SHA-256` before every storage call, so rows key
//! on a digest a database dump cannot replay.

use crate::session::clock::Clock;
use crate::session::policy;
use crate::session::store::{InsertOutcome, TokenRecord, TokenStore};
use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Random bytes behind each token value; hex encoding doubles the length.
const TOKEN_BYTES: usize = 32;

/// Digest collisions are astronomically unlikely, so a couple of retries is
/// already generous.
const INSERT_ATTEMPTS: usize = 3;

/// Issues and verifies opaque session tokens against a [`TokenStore`].
///
/// Validity is computed per call from the clock and the sliding window;
/// nothing about expiry is cached between calls.
pub struct SessionTokens {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    max_age: Duration,
}

impl SessionTokens {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            max_age: policy::default_max_age(),
        }
    }

    /// Override the sliding window, clamped to at least one day.
    #[must_use]
    pub fn with_max_age_days(mut self, days: i64) -> Self {
        self.max_age = Duration::days(days.max(1));
        self
    }

    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Issue a fresh token for `user_id` and return the raw value.
    ///
    /// The window anchor starts at "now": a token never used again lapses
    /// one `max_age` after issuance.
    ///
    /// # Errors
    ///
    /// Fails when storage is unavailable or when every insert attempt
    /// collides on the digest.
    pub async fn issue(&self, user_id: Uuid) -> Result<String> {
        for _ in 0..INSERT_ATTEMPTS {
            let token = generate_token()?;
            let token_hash = hash_token(&token);
            let now = self.clock.now();
            match self
                .store
                .insert(Uuid::now_v7(), &token_hash, user_id, now)
                .await?
            {
                InsertOutcome::Inserted => return Ok(token),
                InsertOutcome::Duplicate => {}
            }
        }

        Err(anyhow!("failed to generate unique session token"))
    }

    /// Resolve a presented value to its owner, refreshing the window on
    /// success.
    ///
    /// `Ok(None)` covers both unknown and expired values; the two are
    /// indistinguishable on purpose. Only storage failures surface as
    /// errors.
    pub async fn verify_and_refresh(&self, token: &str) -> Result<Option<Uuid>> {
        let token_hash = hash_token(token);
        let now = self.clock.now();
        let cutoff = policy::cutoff(now, self.max_age);

        let Some(record) = self.store.find_live(&token_hash, cutoff).await? else {
            return Ok(None);
        };

        // Read then write: two concurrent verifications may both pass and
        // both touch. The later write wins, and either order leaves the
        // anchor at one of the two request instants.
        self.store.touch(&token_hash, now).await?;

        Ok(Some(record.user_id))
    }

    /// Delete one token by raw value. Unknown values are a no-op, which
    /// makes repeated logout calls safe.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let token_hash = hash_token(token);
        self.store.delete(&token_hash).await
    }

    /// Delete every token owned by `user_id`, live or stale. Used when a
    /// password changes or an account is removed.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64> {
        self.store.delete_for_user(user_id).await
    }

    /// Raw read without liveness filtering and without refresh.
    /// Diagnostics and tests only; request authentication never calls this.
    pub async fn lookup(&self, token: &str) -> Result<Option<TokenRecord>> {
        let token_hash = hash_token(token);
        self.store.find(&token_hash).await
    }

    /// One reaper tick: bulk-delete every row at or behind the current
    /// cutoff. Returns the number of rows removed.
    pub async fn sweep_stale(&self) -> Result<u64> {
        let cutoff = policy::cutoff(self.clock.now(), self.max_age);
        let removed = self.store.delete_stale(cutoff).await?;
        if removed > 0 {
            debug!(removed, "swept stale session tokens");
        }
        Ok(removed)
    }
}

/// Create a new opaque token value.
///
/// The raw value is only ever returned to the client; storage sees a digest.
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(hex::encode(bytes))
}

/// Hash a token value so raw values never touch the database.
fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use crate::session::store::MemoryTokenStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn fixture() -> (Arc<ManualClock>, Arc<MemoryTokenStore>, SessionTokens) {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = SessionTokens::new(store.clone(), clock.clone());
        (clock, store, tokens)
    }

    fn start_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_generate_token_is_hex_and_unique() {
        let first = generate_token().unwrap();
        let second = generate_token().unwrap();
        assert_eq!(first.len(), TOKEN_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_token_is_stable_and_one_way() {
        let token = "deadbeef";
        let first = hash_token(token);
        let second = hash_token(token);
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert_ne!(first, token.as_bytes());
        assert_ne!(first, hash_token("deadbeee"));
    }

    #[tokio::test]
    async fn test_issue_then_verify_resolves_owner() -> Result<()> {
        let (_clock, store, tokens) = fixture();
        let user = Uuid::new_v4();

        let token = tokens.issue(user).await?;
        assert_eq!(token.len(), 64);

        let verified = tokens.verify_and_refresh(&token).await?;
        assert_eq!(verified, Some(user));

        // Storage holds the digest, not the value.
        assert!(store.find(token.as_bytes()).await?.is_none());
        assert!(store.find(&hash_token(&token)).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_refreshes_the_window_anchor() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4()).await?;

        clock.advance(Duration::days(4));
        assert!(tokens.verify_and_refresh(&token).await?.is_some());

        let record = tokens.lookup(&token).await?;
        assert_eq!(
            record.map(|record| record.last_used_at),
            Some(start_instant() + Duration::days(4))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_regular_use_keeps_a_session_alive_indefinitely() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4()).await?;

        // Thirty days of a visit every five days, well past the window.
        for _ in 0..6 {
            clock.advance(Duration::days(5));
            assert!(tokens.verify_and_refresh(&token).await?.is_some());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_idle_session_lapses_after_the_window() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4()).await?;

        clock.advance(Duration::days(7) + Duration::seconds(1));
        assert_eq!(tokens.verify_and_refresh(&token).await?, None);

        // Expiry is not revocation: the row is still there until a sweep.
        assert!(tokens.lookup(&token).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_stays_expired_after_failed_verify() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4()).await?;

        clock.advance(Duration::days(8));
        assert_eq!(tokens.verify_and_refresh(&token).await?, None);

        // The failed attempt must not have refreshed anything.
        assert_eq!(tokens.verify_and_refresh(&token).await?, None);
        let record = tokens.lookup(&token).await?;
        assert_eq!(
            record.map(|record| record.last_used_at),
            Some(start_instant())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_exact_boundary_is_expired() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4()).await?;

        clock.advance(Duration::days(7));
        assert_eq!(tokens.verify_and_refresh(&token).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_rejects_unknown_values() -> Result<()> {
        let (_clock, _store, tokens) = fixture();
        assert_eq!(tokens.verify_and_refresh("not-a-token").await?, None);
        assert_eq!(tokens.verify_and_refresh("").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_verifies_both_succeed() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let user = Uuid::new_v4();
        let token = tokens.issue(user).await?;
        clock.advance(Duration::days(3));

        let (first, second) = tokio::join!(
            tokens.verify_and_refresh(&token),
            tokens.verify_and_refresh(&token)
        );
        assert_eq!(first?, Some(user));
        assert_eq!(second?, Some(user));

        let record = tokens.lookup(&token).await?;
        assert_eq!(
            record.map(|record| record.last_used_at),
            Some(start_instant() + Duration::days(3))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_revoke_takes_effect_immediately_and_is_idempotent() -> Result<()> {
        let (_clock, _store, tokens) = fixture();
        let token = tokens.issue(Uuid::new_v4()).await?;

        tokens.revoke(&token).await?;
        assert_eq!(tokens.verify_and_refresh(&token).await?, None);
        assert!(tokens.lookup(&token).await?.is_none());

        // Second revocation of the same value is fine.
        tokens.revoke(&token).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_revoke_all_only_touches_one_owner() -> Result<()> {
        let (_clock, _store, tokens) = fixture();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let alice_one = tokens.issue(alice).await?;
        let alice_two = tokens.issue(alice).await?;
        let bob_one = tokens.issue(bob).await?;

        let removed = tokens.revoke_all(alice).await?;
        assert_eq!(removed, 2);
        assert_eq!(tokens.verify_and_refresh(&alice_one).await?, None);
        assert_eq!(tokens.verify_and_refresh(&alice_two).await?, None);
        assert_eq!(tokens.verify_and_refresh(&bob_one).await?, Some(bob));
        Ok(())
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_rows() -> Result<()> {
        let (clock, store, tokens) = fixture();
        let user = Uuid::new_v4();

        let old = tokens.issue(user).await?;
        clock.advance(Duration::days(4));
        let fresh = tokens.issue(user).await?;
        clock.advance(Duration::days(4));

        // old is 8 days idle, fresh is 4 days idle.
        let removed = tokens.sweep_stale().await?;
        assert_eq!(removed, 1);
        assert!(tokens.lookup(&old).await?.is_none());
        assert!(tokens.lookup(&fresh).await?.is_some());
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_window_applies_to_verify_and_sweep() -> Result<()> {
        let start = start_instant();
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = SessionTokens::new(store, clock.clone()).with_max_age_days(1);

        let token = tokens.issue(Uuid::new_v4()).await?;
        clock.advance(Duration::hours(30));

        assert_eq!(tokens.verify_and_refresh(&token).await?, None);
        assert_eq!(tokens.sweep_stale().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_two_sessions_for_one_user_are_independent() -> Result<()> {
        let (clock, _store, tokens) = fixture();
        let user = Uuid::new_v4();

        let active = tokens.issue(user).await?;
        let idle = tokens.issue(user).await?;

        // Keep one session active while the other idles past the window.
        for _ in 0..2 {
            clock.advance(Duration::days(4));
            assert!(tokens.verify_and_refresh(&active).await?.is_some());
        }

        assert_eq!(tokens.verify_and_refresh(&idle).await?, None);
        assert_eq!(tokens.verify_and_refresh(&active).await?, Some(user));
        Ok(())
    }
}
