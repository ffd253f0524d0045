//! One-way password hashing for the users table.
//!
//! Hashes are `argon2id` PHC strings. Verification treats every parse or
//! mismatch failure the same way, as a plain rejection.

use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Hash a password for storage with the library defaults.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check a candidate against a stored hash.
pub(crate) fn verify_password(stored: &str, candidate: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|hash| Argon2::default().verify_password(candidate.as_bytes(), &hash))
        .is_ok()
}
