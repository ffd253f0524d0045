//! Background reaper for stale token rows.
//!
//! Expired rows stop authenticating the moment their window lapses; the
//! reaper only reclaims the storage behind them. Each tick issues one
//! set-based delete, logs failures, and keeps going. Nothing observable
//! changes if a tick is late or skipped.

use crate::session::tokens::SessionTokens;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

const DEFAULT_INTERVAL_SECONDS: u64 = 3600;

/// Reaper cadence configuration.
#[derive(Clone, Copy, Debug)]
pub struct ReaperConfig {
    interval: Duration,
}

impl ReaperConfig {
    /// Default config: one sweep per hour.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_interval_seconds(mut self, seconds: u64) -> Self {
        self.interval = Duration::from_secs(seconds);
        self
    }

    /// Clamp a zero interval so a misconfigured value cannot spin the loop.
    #[must_use]
    pub fn normalize(self) -> Self {
        let interval = if self.interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.interval
        };
        Self { interval }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the recurring sweep task.
///
/// The first sweep runs immediately so a restarted process reclaims backlog
/// without waiting a full interval. The returned handle belongs to server
/// wiring, which aborts it at shutdown.
pub fn spawn_reaper(
    tokens: Arc<SessionTokens>,
    config: ReaperConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let interval = config.interval();
        info!(
            interval_seconds = interval.as_secs(),
            "session reaper started"
        );

        loop {
            match tokens.sweep_stale().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "session reaper removed stale tokens");
                }
                Ok(_) => {}
                Err(err) => {
                    // Sweeps are retried on the next tick; a failed one
                    // must never take the process down.
                    error!("session reaper sweep failed: {err:#}");
                }
            }

            sleep(interval).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;
    use crate::session::store::MemoryTokenStore;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = ReaperConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(3600));

        let config = ReaperConfig::new().with_interval_seconds(60);
        assert_eq!(config.interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_normalize_clamps_zero_interval() {
        let config = ReaperConfig::new().with_interval_seconds(0).normalize();
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tick_removes_stale_and_keeps_live_rows() -> Result<()> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = SessionTokens::new(store, clock.clone());

        let stale = tokens.issue(Uuid::new_v4()).await?;
        clock.advance(chrono::Duration::days(4));
        let live = tokens.issue(Uuid::new_v4()).await?;
        clock.advance(chrono::Duration::days(4));

        // One tick of reaper work: stale is 8 days idle, live is 4.
        let removed = tokens.sweep_stale().await?;
        assert_eq!(removed, 1);
        assert!(tokens.lookup(&stale).await?.is_none());
        assert!(tokens.lookup(&live).await?.is_some());

        // A second tick with nothing stale removes nothing.
        assert_eq!(tokens.sweep_stale().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_spawned_reaper_sweeps_on_startup() -> Result<()> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryTokenStore::new());
        let tokens = Arc::new(SessionTokens::new(store, clock.clone()));

        let stale = tokens.issue(Uuid::new_v4()).await?;
        clock.advance(chrono::Duration::days(8));

        // Long interval: only the immediate startup sweep can fire.
        let handle = spawn_reaper(tokens.clone(), ReaperConfig::new());

        let mut swept = false;
        for _ in 0..50 {
            if tokens.lookup(&stale).await?.is_none() {
                swept = true;
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(swept, "startup sweep should remove the stale token");
        Ok(())
    }
}
