//! Session introspection and logout.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::identity::{TokenIdentity, bearer_token};
use crate::session::SessionTokens;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: String,
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(identity: Option<Extension<TokenIdentity>>) -> impl IntoResponse {
    // The global layer already verified and refreshed the token; a missing
    // identity means none was presented or it no longer authenticates.
    match identity {
        Some(Extension(identity)) => {
            let response = SessionResponse {
                user_id: identity.user_id.to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    tokens: Extension<Arc<SessionTokens>>,
) -> impl IntoResponse {
    // Deleting by value is idempotent, so unknown, expired, and absent
    // tokens all land on the same 204.
    if let Some(token) = bearer_token(&headers) {
        if let Err(err) = tokens.revoke(&token).await {
            error!("Failed to revoke session token: {err:#}");
        }
    }

    StatusCode::NO_CONTENT
}
