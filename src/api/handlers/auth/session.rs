//! Session transport: token bundles, the `jwt_token` cookie, and the
//! logout/refresh/profile handlers.
//!
//! The cookie mirrors the bearer token so browser clients get a session
//! without handling the bundle themselves. Its Max-Age equals the token TTL;
//! logout clears it, which ends the browser session but cannot retract
//! bearer copies already handed out.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::principal;
use super::state::{AuthConfig, AuthState};
use super::storage::UserRecord;
use super::types::{TokenBundle, UserResponse};

const SESSION_COOKIE: &str = "jwt_token";

/// Session cookie carrying the freshly issued token.
fn session_cookie(config: &AuthConfig, token: &str) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.token_ttl_seconds()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Expired cookie that removes the session from the browser.
fn clear_session_cookie(config: &AuthConfig) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_headers(cookie: &str) -> Result<HeaderMap, AuthError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|err| AuthError::Internal(anyhow::anyhow!("invalid cookie header: {err}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok(headers)
}

/// Issue a token for the user and wrap it as bundle + cookie response.
pub(super) fn token_bundle_response(
    state: &AuthState,
    user: &UserRecord,
    message: &str,
    status: StatusCode,
) -> Result<Response, AuthError> {
    let issued = state
        .token_keys()
        .issue(user.id)
        .map_err(AuthError::Internal)?;
    let bundle = TokenBundle {
        access_token: issued.token.clone(),
        token_type: "bearer".to_string(),
        expires_in: issued.expires_in,
        user: UserResponse::from(user),
        message: message.to_string(),
    };
    let headers = cookie_headers(&session_cookie(state.config(), &issued.token))?;
    Ok((status, headers, Json(bundle)).into_response())
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let user = principal::require_auth(&state, &pool, &headers).await?;

    info!(user_id = %user.id, "User logged out");

    let headers = cookie_headers(&clear_session_cookie(state.config()))?;
    Ok((
        StatusCode::OK,
        headers,
        Json(json!({"message": "User logged out successfully"})),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token bundle", body = TokenBundle),
        (status = 401, description = "Token expired beyond the leeway window")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn refresh(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let user = principal::require_auth_for_refresh(&state, &pool, &headers).await?;

    info!(user_id = %user.id, "Token refreshed");

    token_bundle_response(
        &state,
        &user,
        "Refreshed the token successfully",
        StatusCode::OK,
    )
}

#[utoipa::path(
    get,
    path = "/auth/user-profile",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn user_profile(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let user = principal::require_auth(&state, &pool, &headers).await?;
    Ok(Json(UserResponse::from(&user)).into_response())
}
