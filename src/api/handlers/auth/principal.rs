//! Request authentication and role gating.
//!
//! `require_auth` turns a bearer token into the live user record; the token
//! only names the subject, the record itself is loaded fresh. Role checks go
//! back to the store at check time, so a revoked role takes effect on the
//! next gated request even while older tokens are still valid.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::PgPool;
use uuid::Uuid;

use super::error::AuthError;
use super::state::AuthState;
use super::storage::{self, UserRecord};
use super::token::TokenKeys;

pub(crate) const ADMIN_ROLE: &str = "admin";

/// Bearer token from the Authorization header, if present and well formed.
pub(super) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Authenticate the request: verify the bearer token strictly and load the
/// subject. A valid token whose user no longer exists is unauthenticated.
pub(crate) async fn require_auth(
    state: &AuthState,
    pool: &PgPool,
    headers: &HeaderMap,
) -> Result<UserRecord, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
    let claims = state.token_keys().verify(token)?;
    let user_id = TokenKeys::subject(&claims)?;
    load_principal(pool, user_id).await
}

/// Like `require_auth` but accepts a token within the refresh leeway window.
pub(super) async fn require_auth_for_refresh(
    state: &AuthState,
    pool: &PgPool,
    headers: &HeaderMap,
) -> Result<UserRecord, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
    let claims = state.token_keys().verify_for_refresh(token)?;
    let user_id = TokenKeys::subject(&claims)?;
    load_principal(pool, user_id).await
}

async fn load_principal(pool: &PgPool, user_id: Uuid) -> Result<UserRecord, AuthError> {
    storage::find_user_by_id(pool, user_id)
        .await
        .map_err(AuthError::Internal)?
        .ok_or(AuthError::Unauthenticated)
}

/// Pure role predicate over the resolved role names.
pub(super) fn authorize(role_names: &[String], required: &str) -> bool {
    role_names.iter().any(|name| name == required)
}

/// Gate an already-authenticated user on a role, resolved at check time.
pub(crate) async fn require_role(
    pool: &PgPool,
    user: &UserRecord,
    required: &str,
) -> Result<(), AuthError> {
    let roles = storage::user_role_names(pool, user.id)
        .await
        .map_err(AuthError::Internal)?;
    if authorize(&roles, required) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("value"));
        headers
    }

    #[test]
    fn bearer_token_extracts_value() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes() {
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("bearer abc")), None);
    }

    #[test]
    fn bearer_token_requires_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn authorize_matches_exact_role_name() {
        let roles = vec!["editor".to_string(), "admin".to_string()];
        assert!(authorize(&roles, "admin"));
        assert!(authorize(&roles, "editor"));
        assert!(!authorize(&roles, "Admin"));
        assert!(!authorize(&roles, "viewer"));
        assert!(!authorize(&[], "admin"));
    }
}
