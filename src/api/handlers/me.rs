//! Authenticated self-service endpoints.
//!
//! Every handler here requires a [`TokenIdentity`] from the global bearer
//! layer and answers 401 without one. Password changes and account removal
//! both end with a logout-everywhere: all of the owner's tokens go away in
//! one call.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use super::auth::TokenIdentity;
use super::auth::password::hash_password;
use super::auth::storage::{delete_user, find_user_by_id, update_password_hash};
use crate::session::SessionTokens;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PasswordChangeRequest {
    pub password: String,
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Return the authenticated user profile", body = MeResponse),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "Account no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "me"
)]
pub async fn get_me(
    identity: Option<Extension<TokenIdentity>>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let Some(Extension(identity)) = identity else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match find_user_by_id(&pool, identity.user_id).await {
        Ok(Some(user)) => {
            let response = MeResponse {
                id: user.id.to_string(),
                email: user.email,
                active: user.active,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch user profile: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/me/password",
    request_body = PasswordChangeRequest,
    responses(
        (status = 204, description = "Password changed, all sessions revoked"),
        (status = 400, description = "Rejected password"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "Account no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "me"
)]
pub async fn change_password(
    identity: Option<Extension<TokenIdentity>>,
    pool: Extension<PgPool>,
    tokens: Extension<Arc<SessionTokens>>,
    Json(payload): Json<PasswordChangeRequest>,
) -> impl IntoResponse {
    let Some(Extension(identity)) = identity else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match update_password_hash(&pool, identity.user_id, &password_hash).await {
        Ok(true) => {}
        Ok(false) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update password: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    // Changed credentials invalidate every session, including the one that
    // made this request. The client signs in again with the new password.
    match tokens.revoke_all(identity.user_id).await {
        Ok(revoked) => {
            info!(user_id = %identity.user_id, revoked, "password changed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            error!("Failed to revoke sessions after password change: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/me",
    responses(
        (status = 204, description = "Account and all sessions removed"),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "me"
)]
pub async fn delete_me(
    identity: Option<Extension<TokenIdentity>>,
    pool: Extension<PgPool>,
    tokens: Extension<Arc<SessionTokens>>,
) -> impl IntoResponse {
    let Some(Extension(identity)) = identity else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // Sessions first: the foreign key has no cascade, so the user row can
    // only go once no session references it.
    if let Err(err) = tokens.revoke_all(identity.user_id).await {
        error!("Failed to revoke sessions for account removal: {err:#}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match delete_user(&pool, identity.user_id).await {
        Ok(deleted) => {
            info!(user_id = %identity.user_id, deleted, "account removed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            error!("Failed to delete account: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
