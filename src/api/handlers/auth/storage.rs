//! Database access for users, roles, and verification state.
//!
//! This is the whole store contract the core relies on: lookups by email,
//! id, and verification token, user creation with role attachment, role
//! CRUD, and the two verification-token writes. Consuming a token is a
//! single atomic UPDATE so concurrent consumers cannot double-process.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

const USER_COLUMNS: &str = "id, name, email, password_hash, email_verified_at, \
                            verification_token, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub verification_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub(crate) struct RoleRecord {
    pub(crate) id: Uuid,
    pub(crate) name: String,
}

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(UserRecord),
    /// Duplicate email; the unique constraint is the source of truth.
    Conflict,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        email_verified_at: row.get("email_verified_at"),
        verification_token: row.get("verification_token"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;
    Ok(row.as_ref().map(user_from_row))
}

pub(super) async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;
    Ok(row.as_ref().map(user_from_row))
}

pub(super) async fn find_user_by_verification_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE verification_token = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by verification token")?;
    Ok(row.as_ref().map(user_from_row))
}

/// Create a user and attach its role inside one transaction.
pub(super) async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    verification_token: &str,
    role_id: Uuid,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = format!(
        "INSERT INTO users (name, email, password_hash, verification_token) \
         VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(verification_token)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;

    let user = match row {
        Ok(row) => user_from_row(&row),
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Ok(SignupOutcome::Conflict);
            }
            return Err(err).context("failed to insert user");
        }
    };

    let query = "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user.id)
        .bind(role_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to attach role")?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created(user))
}

/// Role names are resolved at check time so authorization reflects the
/// current persisted state, never a stale token claim.
pub(super) async fn user_role_names(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>> {
    let query = r"
        SELECT roles.name
        FROM user_roles
        JOIN roles ON roles.id = user_roles.role_id
        WHERE user_roles.user_id = $1
        ORDER BY roles.name
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to resolve role names")?;
    Ok(rows.iter().map(|row| row.get("name")).collect())
}

/// Overwrite the live verification token; the prior token is invalid the
/// instant this commits. Only unverified users are eligible.
pub(super) async fn rotate_verification_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET verification_token = $2,
            updated_at = NOW()
        WHERE id = $1
          AND email_verified_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to rotate verification token")?;
    Ok(result.rows_affected() == 1)
}

/// Consume a verification token: set the verified timestamp and clear the
/// token in one atomic UPDATE. Under two concurrent attempts only the first
/// matches the WHERE clause; the second observes `None`.
pub(super) async fn consume_verification_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<UserRecord>> {
    let query = format!(
        "UPDATE users \
         SET email_verified_at = NOW(), \
             verification_token = NULL, \
             updated_at = NOW() \
         WHERE verification_token = $1 \
           AND email_verified_at IS NULL \
         RETURNING {USER_COLUMNS}"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verification token")?;
    Ok(row.as_ref().map(user_from_row))
}

fn role_from_row(row: &sqlx::postgres::PgRow) -> RoleRecord {
    RoleRecord {
        id: row.get("id"),
        name: row.get("name"),
    }
}

/// Case-sensitive exact-match lookup; roles are data, not an enum.
pub(crate) async fn find_role_by_name(pool: &PgPool, name: &str) -> Result<Option<RoleRecord>> {
    let query = "SELECT id, name FROM roles WHERE name = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup role by name")?;
    Ok(row.as_ref().map(role_from_row))
}

pub(crate) async fn find_role_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RoleRecord>> {
    let query = "SELECT id, name FROM roles WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup role by id")?;
    Ok(row.as_ref().map(role_from_row))
}

pub(crate) async fn list_roles(pool: &PgPool) -> Result<Vec<RoleRecord>> {
    let query = "SELECT id, name FROM roles ORDER BY name";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list roles")?;
    Ok(rows.iter().map(role_from_row).collect())
}

/// Outcome of a role insert/update; uniqueness is enforced by the store.
#[derive(Debug)]
pub(crate) enum RoleWriteOutcome {
    Written(RoleRecord),
    Conflict,
    Missing,
}

pub(crate) async fn insert_role(pool: &PgPool, name: &str) -> Result<RoleWriteOutcome> {
    let query = "INSERT INTO roles (name) VALUES ($1) RETURNING id, name";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .fetch_one(pool)
        .instrument(span)
        .await;
    match row {
        Ok(row) => Ok(RoleWriteOutcome::Written(role_from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(RoleWriteOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert role"),
    }
}

pub(crate) async fn update_role(pool: &PgPool, id: Uuid, name: &str) -> Result<RoleWriteOutcome> {
    let query = "UPDATE roles SET name = $2 WHERE id = $1 RETURNING id, name";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .instrument(span)
        .await;
    match row {
        Ok(Some(row)) => Ok(RoleWriteOutcome::Written(role_from_row(&row))),
        Ok(None) => Ok(RoleWriteOutcome::Missing),
        Err(err) if is_unique_violation(&err) => Ok(RoleWriteOutcome::Conflict),
        Err(err) => Err(err).context("failed to update role"),
    }
}

pub(crate) async fn delete_role(pool: &PgPool, id: Uuid) -> Result<bool> {
    // Assignments referencing the role go with it (ON DELETE CASCADE).
    let query = "DELETE FROM roles WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete role")?;
    Ok(result.rows_affected() == 1)
}
