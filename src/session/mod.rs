//! Opaque session token core.
//!
//! Four pieces cooperate here:
//!
//! - [`store`]: persistence primitives keyed by token digest.
//! - [`policy`]: the sliding-window arithmetic shared by reads and sweeps.
//! - [`tokens`]: the lifecycle (issue, verify-and-refresh, revoke, sweep).
//! - [`reaper`]: the recurring task that reclaims stale rows.
//!
//! The HTTP layer only ever talks to [`SessionTokens`]; everything below it
//! is swappable, which is how the in-memory store and the manual clock keep
//! the whole lifecycle testable without a database or real waiting.

pub mod clock;
pub mod policy;
pub mod reaper;
pub mod store;
pub mod tokens;

pub use clock::{Clock, ManualClock, SystemClock};
pub use reaper::{ReaperConfig, spawn_reaper};
pub use store::{InsertOutcome, MemoryTokenStore, PgTokenStore, TokenRecord, TokenStore};
pub use tokens::SessionTokens;
