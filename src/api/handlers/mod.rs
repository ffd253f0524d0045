//! API handlers and shared helpers.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;

use regex::Regex;

/// Lightweight email shape check used before hitting the database.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
