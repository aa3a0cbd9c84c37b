//! Request/response types for auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::storage::UserRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    /// Role attached to the created user; the configured default when omitted.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendVerifyEmailRequest {
    pub email: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendVerificationRequest {
    pub verification_token: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Query half of a signed verification link.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct VerifyLinkQuery {
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Public view of a user; never carries the password hash or the
/// verification token.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserResponse {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            email_verified_at: record.email_verified_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Token bundle returned on login and refresh, mirrored into the
/// `jwt_token` cookie.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenBundle {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until expiry; equals the configured token TTL.
    pub expires_in: i64,
    pub user: UserResponse,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerificationLinkResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.password, "secret1");
        Ok(())
    }

    #[test]
    fn create_user_role_is_optional() -> Result<()> {
        let decoded: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "name": "Ann",
            "email": "ann@x.com",
            "password": "secret1",
            "password_confirmation": "secret1",
        }))?;
        assert_eq!(decoded.role, None);
        Ok(())
    }

    #[test]
    fn user_response_omits_secrets() -> Result<()> {
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            email_verified_at: None,
            verification_token: Some("tok".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = UserResponse::from(&record);
        let value = serde_json::to_value(response)?;
        assert!(value.get("password_hash").is_none());
        assert!(value.get("verification_token").is_none());
        assert_eq!(
            value.get("email").and_then(serde_json::Value::as_str),
            Some("ann@x.com")
        );
        Ok(())
    }

    #[test]
    fn verify_link_query_tolerates_missing_fields() -> Result<()> {
        let decoded: VerifyLinkQuery = serde_json::from_value(serde_json::json!({}))?;
        assert_eq!(decoded.expires, None);
        assert_eq!(decoded.signature, None);
        Ok(())
    }
}
