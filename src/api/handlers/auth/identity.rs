//! Request identity extraction.
//!
//! Two identities exist and never mix: [`TokenIdentity`] comes from the
//! bearer-token layer that runs on every request, [`CredentialIdentity`]
//! from the Basic credentials check that only the login flow performs.

use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{password, storage};
use crate::api::handlers::valid_email;
use crate::session::SessionTokens;

/// Identity attached by the bearer-token layer.
#[derive(Clone, Debug)]
pub struct TokenIdentity {
    pub user_id: Uuid,
}

/// Identity resolved from Basic credentials.
#[derive(Clone, Debug)]
pub struct CredentialIdentity {
    pub user_id: Uuid,
}

/// Global layer: resolve `Authorization: Bearer` into a [`TokenIdentity`]
/// request extension.
///
/// Missing, malformed, unknown, and expired values all mean "no credential";
/// the request proceeds without an identity and route handlers decide what
/// that implies. The one exception is a storage failure, which answers 500
/// so it can never read as "invalid token".
///
/// Verification refreshes the sliding window, and because this layer is
/// global, a valid token presented on any route keeps its session alive.
pub async fn token_authentication(
    tokens: Extension<Arc<SessionTokens>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(value) = bearer_token(request.headers()) {
        match tokens.verify_and_refresh(&value).await {
            Ok(Some(user_id)) => {
                request.extensions_mut().insert(TokenIdentity { user_id });
            }
            Ok(None) => {}
            Err(err) => {
                error!("Failed to verify session token: {err:#}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    next.run(request).await
}

/// Resolve `Authorization: Basic` credentials into a [`CredentialIdentity`].
///
/// Returns `Ok(None)` for missing or malformed headers, unknown emails,
/// wrong passwords, and inactive accounts alike; callers cannot tell which
/// check failed. Storage failures surface as 500.
pub(crate) async fn basic_authentication(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<Option<CredentialIdentity>, StatusCode> {
    let Some((email, password)) = basic_credentials(headers) else {
        return Ok(None);
    };

    if !valid_email(&email) {
        return Ok(None);
    }

    let user = match storage::find_user_by_email(pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(None),
        Err(err) => {
            error!("Failed to lookup user for login: {err:#}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    if !user.active {
        return Ok(None);
    }

    if !password::verify_password(&user.password_hash, password.expose_secret()) {
        return Ok(None);
    }

    Ok(Some(CredentialIdentity { user_id: user.id }))
}

/// Extract the bearer value; malformed headers read as "no credential".
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, SecretString)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let encoded = trimmed
        .strip_prefix("Basic ")
        .or_else(|| trimmed.strip_prefix("basic "))?
        .trim();
    let decoded = Base64::decode_vec(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    if email.is_empty() {
        return None;
    }
    Some((email.to_string(), SecretString::from(password.to_string())))
}
