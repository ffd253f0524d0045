//! # Pordisto (Opaque Session Token Authority)
//!
//! `pordisto` issues and verifies opaque bearer tokens for interactive user
//! sessions. Clients exchange credentials once (`POST /v1/auth/login`) and
//! present the returned token on every subsequent request.
//!
//! ## Token Model
//!
//! Tokens are random values with no embedded claims; the database row is the
//! single source of truth. Only a `SHA-256` digest of each value is stored,
//! so a leaked database dump contains nothing a client could present.
//!
//! ## Sliding-Window Expiry
//!
//! There is no expiry column. Each row carries a `last_used_at` timestamp and
//! a token is live exactly when that timestamp is newer than `now - max_age`
//! (7 days by default). Every authenticated request refreshes the timestamp,
//! so active sessions never expire and idle ones lapse on their own.
//!
//! - **Computed validity:** Liveness is evaluated against the current clock
//!   on every check; nothing is cached or precomputed.
//! - **Refresh on use:** Verification and refresh are one operation. A token
//!   that authenticates a request has its window extended by that request.
//!
//! ## Background Reaper
//!
//! Expired rows stop authenticating immediately, but the bytes linger until
//! a recurring task sweeps them with one set-based delete per tick. The
//! reaper is garbage collection only; correctness never depends on it.

pub mod api;
pub mod cli;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result, ensure};
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    // Normalize SQL to avoid brittle formatting checks in schema tests.
    fn canonicalize_sql(sql: &str) -> String {
        sql.chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_lowercase())
            .collect()
    }

    fn canonical_sql(path: &Path) -> Result<String> {
        let sql = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file at {}", path.display()))?;
        Ok(canonicalize_sql(&sql))
    }

    fn assert_contains(path: &Path, canonical: &str, needle: &str) -> Result<()> {
        ensure!(
            canonical.contains(needle),
            "Expected snippet {needle} is missing in {}",
            path.display()
        );
        Ok(())
    }

    #[test]
    fn schema_sql_integrity() -> Result<()> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("db/sql/01_pordisto.sql");
        let canonical = canonical_sql(&path)?;
        // Token values never land in the schema, only their digests.
        assert_contains(&path, &canonical, "token_hashbyteanotnullunique")?;
        // The sliding window hangs off last_used_at; there is no expires_at.
        assert_contains(&path, &canonical, "last_used_attimestamptznotnull")?;
        ensure!(
            !canonical.contains("expires_at"),
            "Schema must not carry a precomputed expiry column in {}",
            path.display()
        );
        // The reaper scans by last use, logout-everywhere by owner.
        assert_contains(&path, &canonical, "onsessions(last_used_at)")?;
        assert_contains(&path, &canonical, "onsessions(user_id)")
    }

    #[test]
    fn init_sql_includes_schema() -> Result<()> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("db/sql/00_init.sql");
        let canonical = canonical_sql(&path)?;
        assert_contains(&path, &canonical, r"\ir01_pordisto.sql")
    }
}
