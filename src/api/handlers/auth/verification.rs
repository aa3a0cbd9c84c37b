//! Email verification lifecycle: send, resend, and consume.
//!
//! A user holds at most one live verification token; every rotation
//! invalidates the previous link. Consuming is an atomic store update, so
//! two racing clicks on the same link verify exactly once. A link that
//! fails its signature or expiry check does not verify; the token is
//! rotated and a fresh link is mailed out instead.

use axum::{
    extract::{Extension, Path, Query},
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::email;

use super::error::{AuthError, ValidationErrors};
use super::state::AuthState;
use super::storage::{self, UserRecord};
use super::types::{
    ResendVerificationRequest, SendVerifyEmailRequest, VerificationLinkResponse, VerifyLinkQuery,
};
use super::utils::{generate_verification_token, normalize_email, valid_email};

fn invalid_token_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"message": "Invalid verification token"})),
    )
        .into_response()
}

/// Redirect targets end up in a Location header and inside mailed links, so
/// control characters are rejected before anything is issued or consumed.
fn validate_redirect(redirect_url: Option<&str>) -> Result<(), AuthError> {
    match redirect_url {
        Some(url) if url.chars().any(char::is_control) => {
            let mut errors = ValidationErrors::new();
            errors.insert(
                "redirect_url".to_string(),
                vec!["The redirect url must not contain control characters.".to_string()],
            );
            Err(AuthError::BadRequest(errors))
        }
        _ => Ok(()),
    }
}

/// 303 to the caller's target; a target that cannot form a header value is a
/// 400, never a panic.
fn redirect_response(target: &str) -> Response {
    match HeaderValue::from_str(target) {
        Ok(location) => {
            let mut response = StatusCode::SEE_OTHER.into_response();
            response.headers_mut().insert(LOCATION, location);
            response
        }
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Invalid redirect target"})),
        )
            .into_response(),
    }
}

/// Signed link for a token, valid for the configured window from now.
fn build_link(state: &AuthState, token: &str, redirect_url: &str) -> String {
    let expires_at = Utc::now() + Duration::seconds(state.config().verify_link_ttl_seconds());
    state
        .link_signer()
        .build_link(state.config().base_url(), token, redirect_url, expires_at)
}

/// Rotate the user's verification token, mail the fresh signed link, and
/// return its URL. The previous token is dead once this returns.
async fn rotate_and_send(
    state: &AuthState,
    pool: &PgPool,
    user: &UserRecord,
    redirect_url: &str,
) -> Result<String, AuthError> {
    let token = generate_verification_token().map_err(AuthError::Internal)?;
    let rotated = storage::rotate_verification_token(pool, user.id, &token)
        .await
        .map_err(AuthError::Internal)?;
    if !rotated {
        // Verified concurrently; there is nothing left to rotate.
        return Err(AuthError::AlreadyVerified);
    }

    let url = build_link(state, &token, redirect_url);
    email::dispatch(
        state.email_sender(),
        email::verification_message(&user.email, &url),
    );
    Ok(url)
}

fn redirect_or_default<'a>(redirect_url: Option<&'a str>, state: &'a AuthState) -> &'a str {
    match redirect_url {
        Some(url) if !url.is_empty() => url,
        _ => state.config().base_url(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/send-verify-email",
    request_body = SendVerifyEmailRequest,
    responses(
        (status = 200, description = "Verification link issued", body = VerificationLinkResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No user with that email"),
        (status = 409, description = "Email already verified")
    ),
    tag = "auth"
)]
pub async fn send_verify_email(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<SendVerifyEmailRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        let mut errors = ValidationErrors::new();
        errors.insert(
            "email".to_string(),
            vec!["The email field is required.".to_string()],
        );
        return Err(AuthError::BadRequest(errors));
    };

    let email_normalized = normalize_email(&request.email);
    if !valid_email(&email_normalized) {
        let mut errors = ValidationErrors::new();
        errors.insert(
            "email".to_string(),
            vec!["The email must be a valid email address.".to_string()],
        );
        return Err(AuthError::BadRequest(errors));
    }
    validate_redirect(request.redirect_url.as_deref())?;

    let user = storage::find_user_by_email(&pool, &email_normalized)
        .await
        .map_err(AuthError::Internal)?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    if user.email_verified_at.is_some() {
        return Err(AuthError::AlreadyVerified);
    }

    let redirect_url = redirect_or_default(request.redirect_url.as_deref(), &state);

    // Reuse the live token when one exists so earlier links stay valid;
    // a user without one (consumed or never issued) gets a rotation.
    let url = match &user.verification_token {
        Some(token) => {
            let url = build_link(&state, token, redirect_url);
            email::dispatch(
                state.email_sender(),
                email::verification_message(&user.email, &url),
            );
            url
        }
        None => rotate_and_send(&state, &pool, &user, redirect_url).await?,
    };

    info!(user_id = %user.id, "Verification email dispatched");

    Ok(Json(VerificationLinkResponse { url }).into_response())
}

#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Fresh verification link issued", body = VerificationLinkResponse),
        (status = 404, description = "Unknown verification token"),
        (status = 409, description = "Email already verified")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        let mut errors = ValidationErrors::new();
        errors.insert(
            "verification_token".to_string(),
            vec!["The verification token field is required.".to_string()],
        );
        return Err(AuthError::BadRequest(errors));
    };

    validate_redirect(request.redirect_url.as_deref())?;

    let user = storage::find_user_by_verification_token(&pool, &request.verification_token)
        .await
        .map_err(AuthError::Internal)?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    if user.email_verified_at.is_some() {
        return Err(AuthError::AlreadyVerified);
    }

    let redirect_url = redirect_or_default(request.redirect_url.as_deref(), &state);
    let url = rotate_and_send(&state, &pool, &user, redirect_url).await?;

    info!(user_id = %user.id, "Verification link rotated and resent");

    Ok(Json(VerificationLinkResponse { url }).into_response())
}

#[utoipa::path(
    get,
    path = "/auth/verify-email/{verification_token}/{redirect_url}",
    params(
        ("verification_token" = String, Path, description = "Opaque single-use token"),
        ("redirect_url" = String, Path, description = "Percent-encoded redirect target"),
        ("expires" = Option<i64>, Query, description = "Link expiry, unix seconds"),
        ("signature" = Option<String>, Query, description = "Link signature")
    ),
    responses(
        (status = 303, description = "Email verified, redirecting"),
        (status = 200, description = "Stale or tampered link; fresh link issued", body = VerificationLinkResponse),
        (status = 400, description = "Unknown or already consumed token")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    Path((verification_token, redirect_url)): Path<(String, String)>,
    Query(query): Query<VerifyLinkQuery>,
) -> Result<Response, AuthError> {
    let user = storage::find_user_by_verification_token(&pool, &verification_token)
        .await
        .map_err(AuthError::Internal)?;
    let Some(user) = user else {
        return Ok(invalid_token_response());
    };

    // The signature covers the decoded redirect target exactly as presented.
    let link_ok = match (query.expires, query.signature.as_deref()) {
        (Some(expires), Some(signature)) => state.link_signer().verify(
            &verification_token,
            &redirect_url,
            expires,
            signature,
            Utc::now(),
        ),
        _ => false,
    };

    if !link_ok {
        warn!(user_id = %user.id, "Stale or tampered verification link, rotating token");
        let url = rotate_and_send(&state, &pool, &user, &redirect_url).await?;
        return Ok(Json(json!({
            "message": "Verification link expired or invalid, a new link has been sent",
            "url": url,
        }))
        .into_response());
    }

    // First consumer wins; the loser of a race sees an unknown token.
    let consumed = storage::consume_verification_token(&pool, &verification_token)
        .await
        .map_err(AuthError::Internal)?;
    match consumed {
        Some(user) => {
            info!(user_id = %user.id, "Email verified");
            Ok(redirect_response(&redirect_url))
        }
        None => Ok(invalid_token_response()),
    }
}
