//! Typed failure taxonomy for the auth handlers.
//!
//! Every failure is resolved locally and converted here to a fixed status
//! code and JSON body; nothing crashes a request. Credential failures carry
//! one deliberately identical message for unknown email and wrong password.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

/// Field-level validation detail: field -> list of messages.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed login input; reported with field detail as 422.
    #[error("Validation failed")]
    Unprocessable(ValidationErrors),

    /// Malformed registration/role input; reported with field detail as 400.
    #[error("Validation failed")]
    BadRequest(ValidationErrors),

    /// Unknown email or wrong password; indistinguishable on purpose.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    /// Missing, invalid, or expired bearer token.
    #[error("User not authenticated")]
    Unauthenticated,

    /// Authenticated but the role gate denied the request.
    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Email has already been verified")]
    AlreadyVerified,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Convenience for duplicate-email unique violations surfaced as field detail.
    pub(crate) fn email_taken() -> Self {
        let mut errors = ValidationErrors::new();
        errors.insert(
            "email".to_string(),
            vec!["The email has already been taken.".to_string()],
        );
        Self::BadRequest(errors)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unprocessable(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "Validation failed", "data": errors})),
            )
                .into_response(),
            Self::BadRequest(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": errors}))).into_response()
            }
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid credentials"})),
            )
                .into_response(),
            Self::EmailNotVerified => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "Email not verified"})),
            )
                .into_response(),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "User not authenticated"})),
            )
                .into_response(),
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, Json(json!({"message": "Forbidden"}))).into_response()
            }
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({"message": message}))).into_response()
            }
            Self::AlreadyVerified => (
                StatusCode::CONFLICT,
                Json(json!({"message": "Email has already been verified"})),
            )
                .into_response(),
            Self::Internal(err) => {
                // Internal detail stays in the logs, never in the body.
                error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn errors_for(field: &str, message: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        errors
    }

    #[test]
    fn login_validation_is_422() {
        let response =
            AuthError::Unprocessable(errors_for("email", "The email field is required."))
                .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn registration_validation_is_400() {
        let response = AuthError::email_taken().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn credential_failures_share_one_message() {
        // Unknown email and wrong password must be indistinguishable.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AuthError::EmailNotVerified.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::NotFound("User not found".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::AlreadyVerified.into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
