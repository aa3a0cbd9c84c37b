//! Registration: self-service signup and admin-driven user creation.
//!
//! Both paths create an unverified user holding a fresh verification token.
//! Email uniqueness is enforced by the store; the unique violation surfaces
//! as field-level detail instead of a crash.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{AuthError, ValidationErrors};
use super::password;
use super::principal::{self, ADMIN_ROLE};
use super::state::AuthState;
use super::storage::{self, SignupOutcome};
use super::types::{CreateUserRequest, RegisterRequest, UserResponse};
use super::utils::{generate_verification_token, normalize_email, valid_email};

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 6;

fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    password_confirmation: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if name.is_empty() {
        errors.insert(
            "name".to_string(),
            vec!["The name field is required.".to_string()],
        );
    } else if name.chars().count() < MIN_NAME_LENGTH {
        errors.insert(
            "name".to_string(),
            vec![format!(
                "The name must be at least {MIN_NAME_LENGTH} characters."
            )],
        );
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.insert(
            "name".to_string(),
            vec![format!(
                "The name may not be greater than {MAX_NAME_LENGTH} characters."
            )],
        );
    }

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
    } else if email.chars().count() > MAX_EMAIL_LENGTH {
        errors.insert(
            "email".to_string(),
            vec![format!(
                "The email may not be greater than {MAX_EMAIL_LENGTH} characters."
            )],
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
    } else if password != password_confirmation {
        errors.insert(
            "password".to_string(),
            vec!["The password confirmation does not match.".to_string()],
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Insert the user with a fresh verification token attached to `role_id`.
async fn signup(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
    role_id: Uuid,
) -> Result<UserResponse, AuthError> {
    let email = normalize_email(email);
    let password_hash = password::hash_password(password).map_err(AuthError::Internal)?;
    let verification_token = generate_verification_token().map_err(AuthError::Internal)?;

    let outcome = storage::create_user(
        pool,
        name.trim(),
        &email,
        &password_hash,
        &verification_token,
        role_id,
    )
    .await
    .map_err(AuthError::Internal)?;

    match outcome {
        SignupOutcome::Created(user) => Ok(UserResponse::from(&user)),
        SignupOutcome::Conflict => Err(AuthError::email_taken()),
    }
}

async fn resolve_role_id(pool: &PgPool, name: &str) -> Result<Option<Uuid>, AuthError> {
    let role = storage::find_role_by_name(pool, name)
        .await
        .map_err(AuthError::Internal)?;
    Ok(role.map(|role| role.id))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created, unverified", body = UserResponse),
        (status = 400, description = "Validation failed or email taken")
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        // No payload reports the same field detail as an empty one.
        return Err(AuthError::BadRequest(
            validate_registration("", "", "", "").err().unwrap_or_default(),
        ));
    };

    validate_registration(
        &request.name,
        &request.email,
        &request.password,
        &request.password_confirmation,
    )
    .map_err(AuthError::BadRequest)?;

    let default_role = state.config().default_role();
    let role_id = resolve_role_id(&pool, default_role)
        .await?
        .ok_or_else(|| {
            AuthError::Internal(anyhow::anyhow!("default role {default_role:?} is not seeded"))
        })?;

    let user = signup(
        &pool,
        &request.name,
        &request.email,
        &request.password,
        role_id,
    )
    .await?;

    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "User successfully registered", "user": user})),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/auth/createUser",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created, unverified", body = UserResponse),
        (status = 400, description = "Validation failed or email taken"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller lacks the admin role"),
        (status = 404, description = "Requested role does not exist")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn create_user(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
    payload: Option<Json<CreateUserRequest>>,
) -> Result<Response, AuthError> {
    let caller = principal::require_auth(&state, &pool, &headers).await?;
    principal::require_role(&pool, &caller, ADMIN_ROLE).await?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::BadRequest(
            validate_registration("", "", "", "").err().unwrap_or_default(),
        ));
    };

    validate_registration(
        &request.name,
        &request.email,
        &request.password,
        &request.password_confirmation,
    )
    .map_err(AuthError::BadRequest)?;

    // The role is resolved before any write so a bad role name creates nothing.
    let role_name = request
        .role
        .as_deref()
        .unwrap_or_else(|| state.config().default_role());
    let role_id = resolve_role_id(&pool, role_name)
        .await?
        .ok_or_else(|| AuthError::NotFound("no role found with that name".to_string()))?;

    let user = signup(
        &pool,
        &request.name,
        &request.email,
        &request.password,
        role_id,
    )
    .await?;

    info!(user_id = %user.id, created_by = %caller.id, role = role_name, "User created");

    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "User successfully created", "user": user})),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::test_support::auth_state;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn validate_registration_accepts_well_formed_input() {
        assert!(validate_registration("Ann", "ann@example.com", "secret1", "secret1").is_ok());
    }

    #[test]
    fn validate_registration_requires_all_fields() {
        let errors = validate_registration("", "", "", "").expect_err("errors");
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn validate_registration_bounds_name_and_email() {
        let errors = validate_registration("A", "ann@example.com", "secret1", "secret1")
            .expect_err("errors");
        assert_eq!(
            errors.get("name").map(Vec::as_slice),
            Some(&["The name must be at least 2 characters.".to_string()][..])
        );

        let long_name = "n".repeat(101);
        let errors = validate_registration(&long_name, "ann@example.com", "secret1", "secret1")
            .expect_err("errors");
        assert!(errors.contains_key("name"));

        let long_email = format!("{}@example.com", "e".repeat(100));
        let errors = validate_registration("Ann", &long_email, "secret1", "secret1")
            .expect_err("errors");
        assert!(errors.contains_key("email"));
    }

    #[test]
    fn validate_registration_checks_confirmation() {
        let errors = validate_registration("Ann", "ann@example.com", "secret1", "different")
            .expect_err("errors");
        assert_eq!(
            errors.get("password").map(Vec::as_slice),
            Some(&["The password confirmation does not match.".to_string()][..])
        );
    }

    #[tokio::test]
    async fn register_without_payload_is_bad_request() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://postgres@127.0.0.1:1/postgres")
            .expect("lazy pool");
        let result = register(Extension(auth_state()), Extension(pool), None).await;
        assert!(matches!(result, Err(AuthError::BadRequest(_))));
    }

    #[tokio::test]
    async fn create_user_requires_authentication_before_validation() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://postgres@127.0.0.1:1/postgres")
            .expect("lazy pool");
        let result = create_user(
            Extension(auth_state()),
            Extension(pool),
            HeaderMap::new(),
            None,
        )
        .await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }
}
