//! Credentials login: Basic auth in, opaque session token out.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use super::identity::basic_authentication;
use crate::session::SessionTokens;

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Id of the authenticated user.
    pub id: String,
    /// Raw session token; shown once and never stored server side.
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    responses(
        (status = 200, description = "Credentials accepted, session token issued", body = LoginResponse),
        (status = 401, description = "Missing or rejected credentials")
    ),
    security(
        ("basic_auth" = [])
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    tokens: Extension<Arc<SessionTokens>>,
) -> impl IntoResponse {
    // Only Basic credentials count here. A bearer identity attached by the
    // global layer is ignored: presenting an old token must not mint a new
    // one.
    let identity = match basic_authentication(&headers, &pool).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(status) => return status.into_response(),
    };

    match tokens.issue(identity.user_id).await {
        Ok(token) => {
            debug!(user_id = %identity.user_id, "issued session token");
            let response = LoginResponse {
                id: identity.user_id.to_string(),
                token,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to issue session token: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
