//! Sliding-window expiry policy.
//!
//! Pure arithmetic with no storage access: a token is live exactly when its
//! last use is more recent than the cutoff for the configured window. The
//! same cutoff feeds the live-row lookup and the reaper's bulk delete, so
//! the two can never disagree about which rows are stale.

use chrono::{DateTime, Duration, Utc};

/// Default window for interactive sessions, in days.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// Instant before which a last-use timestamp no longer authenticates.
#[must_use]
pub fn cutoff(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    now - max_age
}

/// Whether a token last used at `last_used_at` is still live at `now`.
///
/// The comparison is strict: a token whose last use sits exactly on the
/// cutoff is expired.
#[must_use]
pub fn is_live(last_used_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    last_used_at > cutoff(now, max_age)
}

/// The default window as a [`Duration`].
#[must_use]
pub fn default_max_age() -> Duration {
    Duration::days(DEFAULT_MAX_AGE_DAYS)
}
