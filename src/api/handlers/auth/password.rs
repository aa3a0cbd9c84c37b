//! Password hashing and credential verification.
//!
//! Hashes are bcrypt with the default cost. Verification resolves the user
//! by email and checks the hash; unknown email and wrong password both map
//! to `InvalidCredentials` so neither case leaks account existence.

use anyhow::{Context, Result};
use sqlx::PgPool;

use super::error::AuthError;
use super::storage::{self, UserRecord};
use super::utils::normalize_email;

pub(super) fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash password")
}

fn password_matches(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Resolve an email/password pair to its user record.
pub(super) async fn verify_credentials(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let email = normalize_email(email);
    let user = storage::find_user_by_email(pool, &email)
        .await
        .map_err(AuthError::Internal)?;
    match user {
        Some(user) if password_matches(password, &user.password_hash) => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("hunter2!").expect("hash");
        assert!(hash.starts_with("$2"));
        assert!(password_matches("hunter2!", &hash));
        assert!(!password_matches("hunter3!", &hash));
    }

    #[test]
    fn two_hashes_of_same_password_differ() {
        // Each hash carries a fresh salt.
        let a = hash_password("hunter2!").expect("hash");
        let b = hash_password("hunter2!").expect("hash");
        assert_ne!(a, b);
        assert!(password_matches("hunter2!", &a));
        assert!(password_matches("hunter2!", &b));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!password_matches("hunter2!", "not-a-bcrypt-hash"));
        assert!(!password_matches("hunter2!", ""));
    }
}
