//! Role resource: admin-gated CRUD over store-managed roles.
//!
//! Roles are data, not an enum; names are unique, case-sensitive, and
//! resolved by exact match. Validation is a capability trait per resource
//! so another single-name resource can reuse the same handler shape.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::principal::{require_auth, require_role, ADMIN_ROLE};
use super::auth::storage::{self, RoleRecord, RoleWriteOutcome};
use super::auth::{AuthError, AuthState, ValidationErrors};

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 255;

/// Validation capability of a named resource; one generic CRUD flow is
/// specialized by implementing this per entity.
pub(crate) trait ResourceRules {
    fn validate_create(name: &str) -> Result<(), ValidationErrors>;
    fn validate_update(name: &str) -> Result<(), ValidationErrors>;
}

pub(crate) struct RoleRules;

impl ResourceRules for RoleRules {
    fn validate_create(name: &str) -> Result<(), ValidationErrors> {
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
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // Renames tolerate short names that predate the create rule.
    fn validate_update(name: &str) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if name.is_empty() {
            errors.insert(
                "name".to_string(),
                vec!["The name field is required.".to_string()],
            );
        } else if name.chars().count() > MAX_NAME_LENGTH {
            errors.insert(
                "name".to_string(),
                vec![format!(
                    "The name may not be greater than {MAX_NAME_LENGTH} characters."
                )],
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RoleRequest {
    pub name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<&RoleRecord> for RoleResponse {
    fn from(record: &RoleRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
        }
    }
}

fn name_taken() -> AuthError {
    let mut errors = ValidationErrors::new();
    errors.insert(
        "name".to_string(),
        vec!["The name has already been taken.".to_string()],
    );
    AuthError::BadRequest(errors)
}

fn role_not_found() -> AuthError {
    AuthError::NotFound("Role not found".to_string())
}

/// Admin gate shared by every role handler.
async fn gate(state: &AuthState, pool: &PgPool, headers: &HeaderMap) -> Result<(), AuthError> {
    let caller = require_auth(state, pool, headers).await?;
    require_role(pool, &caller, ADMIN_ROLE).await
}

fn validated_name<R: ResourceRules>(
    payload: Option<Json<RoleRequest>>,
    update: bool,
) -> Result<String, AuthError> {
    let name = payload.map(|Json(request)| request.name).unwrap_or_default();
    let name = name.trim().to_string();
    let checked = if update {
        R::validate_update(&name)
    } else {
        R::validate_create(&name)
    };
    checked.map_err(AuthError::BadRequest)?;
    Ok(name)
}

#[utoipa::path(
    get,
    path = "/roles",
    responses(
        (status = 200, description = "All roles, ordered by name", body = [RoleResponse]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller lacks the admin role")
    ),
    security(("bearer" = [])),
    tag = "roles"
)]
pub async fn index(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    gate(&state, &pool, &headers).await?;
    let roles = storage::list_roles(&pool).await.map_err(AuthError::Internal)?;
    let roles: Vec<RoleResponse> = roles.iter().map(RoleResponse::from).collect();
    Ok(Json(roles).into_response())
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "The role", body = RoleResponse),
        (status = 404, description = "No role with that id")
    ),
    security(("bearer" = [])),
    tag = "roles"
)]
pub async fn show(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AuthError> {
    gate(&state, &pool, &headers).await?;
    let role = storage::find_role_by_id(&pool, id)
        .await
        .map_err(AuthError::Internal)?
        .ok_or_else(role_not_found)?;
    Ok(Json(RoleResponse::from(&role)).into_response())
}

#[utoipa::path(
    post,
    path = "/roles",
    request_body = RoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Validation failed or name taken")
    ),
    security(("bearer" = [])),
    tag = "roles"
)]
pub async fn store(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
    payload: Option<Json<RoleRequest>>,
) -> Result<Response, AuthError> {
    gate(&state, &pool, &headers).await?;
    let name = validated_name::<RoleRules>(payload, false)?;

    match storage::insert_role(&pool, &name)
        .await
        .map_err(AuthError::Internal)?
    {
        RoleWriteOutcome::Written(role) => {
            info!(role_id = %role.id, role = %role.name, "Role created");
            Ok((StatusCode::CREATED, Json(RoleResponse::from(&role))).into_response())
        }
        RoleWriteOutcome::Conflict => Err(name_taken()),
        RoleWriteOutcome::Missing => Err(role_not_found()),
    }
}

#[utoipa::path(
    put,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role renamed", body = RoleResponse),
        (status = 400, description = "Validation failed or name taken"),
        (status = 404, description = "No role with that id")
    ),
    security(("bearer" = [])),
    tag = "roles"
)]
pub async fn update(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    payload: Option<Json<RoleRequest>>,
) -> Result<Response, AuthError> {
    gate(&state, &pool, &headers).await?;
    let name = validated_name::<RoleRules>(payload, true)?;

    match storage::update_role(&pool, id, &name)
        .await
        .map_err(AuthError::Internal)?
    {
        RoleWriteOutcome::Written(role) => {
            info!(role_id = %role.id, role = %role.name, "Role renamed");
            Ok(Json(RoleResponse::from(&role)).into_response())
        }
        RoleWriteOutcome::Conflict => Err(name_taken()),
        RoleWriteOutcome::Missing => Err(role_not_found()),
    }
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted; assignments cascade"),
        (status = 404, description = "No role with that id")
    ),
    security(("bearer" = [])),
    tag = "roles"
)]
pub async fn destroy(
    Extension(state): Extension<Arc<AuthState>>,
    Extension(pool): Extension<PgPool>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AuthError> {
    gate(&state, &pool, &headers).await?;
    if storage::delete_role(&pool, id)
        .await
        .map_err(AuthError::Internal)?
    {
        info!(role_id = %id, "Role deleted");
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(role_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::test_support::auth_state;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(100))
            .connect_lazy("postgres://postgres@127.0.0.1:1/postgres")
            .expect("lazy pool")
    }

    #[test]
    fn create_rules_bound_the_name() {
        assert!(RoleRules::validate_create("editor").is_ok());
        assert!(RoleRules::validate_create("").is_err());
        assert!(RoleRules::validate_create("ab").is_err());
        assert!(RoleRules::validate_create(&"n".repeat(256)).is_err());
        assert!(RoleRules::validate_create(&"n".repeat(255)).is_ok());
    }

    #[test]
    fn update_rules_allow_short_names() {
        assert!(RoleRules::validate_update("ab").is_ok());
        assert!(RoleRules::validate_update("").is_err());
        assert!(RoleRules::validate_update(&"n".repeat(256)).is_err());
    }

    #[test]
    fn validated_name_trims_and_reports_missing_payload() {
        let name = validated_name::<RoleRules>(
            Some(Json(RoleRequest {
                name: "  editor  ".to_string(),
            })),
            false,
        )
        .expect("name");
        assert_eq!(name, "editor");

        assert!(matches!(
            validated_name::<RoleRules>(None, false),
            Err(AuthError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn handlers_require_authentication() {
        let state = auth_state();
        let result = index(
            Extension(state.clone()),
            Extension(lazy_pool()),
            HeaderMap::new(),
        )
        .await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));

        let result = destroy(
            Extension(state),
            Extension(lazy_pool()),
            HeaderMap::new(),
            Path(Uuid::new_v4()),
        )
        .await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }
}
