//! Login: credential verification and token bundle issuance.

use axum::{extract::Extension, http::StatusCode, response::Response, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::{AuthError, ValidationErrors};
use super::password;
use super::session::token_bundle_response;
use super::state::AuthState;
use super::types::{LoginRequest, TokenBundle};
use super::utils::{normalize_email, valid_email};

const MIN_PASSWORD_LENGTH: usize = 6;

fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if email.is_empty() {
        errors.insert(
            "email".to_string(),
            vec!["The email field is required.".to_string()],
        );
    } else if !valid_email(&normalize_email(email)) {
        errors.insert(
            "email".to_string(),
            vec!["The email must be a valid email address.".to_string()],
        );
    }
    if password.is_empty() {
        errors.insert(
            "password".to_string(),
            vec!["The password field is required.".to_string()],
        );
    } else if password.len() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password".to_string(),
            vec![format!(
                "The password must be at least {MIN_PASSWORD_LENGTH} characters."
            )],
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token bundle for the session", body = TokenBundle),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified"),
        (status = 422, description = "Validation failed")
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        // No payload reports the same field detail as an empty one.
        return Err(AuthError::Unprocessable(
            validate_login("", "").err().unwrap_or_default(),
        ));
    };

    validate_login(&request.email, &request.password).map_err(AuthError::Unprocessable)?;

    let user = password::verify_credentials(&pool, &request.email, &request.password).await?;

    // Credentials alone are not enough; the email has to be verified first.
    if user.email_verified_at.is_none() {
        return Err(AuthError::EmailNotVerified);
    }

    info!(user_id = %user.id, "User logged in");

    token_bundle_response(&state, &user, "Successfully logged in", StatusCode::OK)
}
