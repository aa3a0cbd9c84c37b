//! Access token issuance and verification.
//!
//! Tokens are stateless HS256 JWTs: nothing is persisted, validity is
//! signature + expiry. Refresh mints a new token for the same subject and
//! accepts the old one within a configured leeway window past expiry.
//! There is no denylist, so a refreshed or logged-out token stays
//! verifiable until its own expiry; callers must treat that as a known
//! limitation of the stateless model.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct Claims {
    /// Subject: the user id.
    pub(super) sub: String,
    pub(super) iat: i64,
    pub(super) exp: i64,
}

pub(super) struct IssuedToken {
    pub(super) token: String,
    /// Seconds until expiry, as reported in the token bundle.
    pub(super) expires_in: i64,
}

/// Signing and verification keys plus the TTL policy.
pub(super) struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
    refresh_leeway_seconds: u64,
}

impl TokenKeys {
    pub(super) fn new(secret: &SecretString, ttl_seconds: i64, refresh_leeway_seconds: u64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl_seconds,
            refresh_leeway_seconds,
        }
    }

    pub(super) fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Mint a token for a verified identity. Always succeeds given a subject.
    pub(super) fn issue(&self, user_id: Uuid) -> Result<IssuedToken> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .context("failed to sign access token")?;
        Ok(IssuedToken {
            token,
            expires_in: self.ttl_seconds,
        })
    }

    /// Strict verification for request authentication: no expiry leeway.
    pub(super) fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode(token, 0)
    }

    /// Refresh verification: the configured leeway window past expiry is
    /// still acceptable so an in-flight refresh does not race the clock.
    pub(super) fn verify_for_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode(token, self.refresh_leeway_seconds)
    }

    fn decode(&self, token: &str, leeway: u64) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::Unauthenticated)
    }

    /// Subject of a verified token, or `Unauthenticated` for a garbled one.
    pub(super) fn subject(claims: &Claims) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ttl_seconds: i64, leeway: u64) -> TokenKeys {
        TokenKeys::new(
            &SecretString::from("test-secret-key-12345".to_string()),
            ttl_seconds,
            leeway,
        )
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = keys(3600, 60);
        let user_id = Uuid::new_v4();

        let issued = keys.issue(user_id).expect("issue");
        assert_eq!(issued.expires_in, 3600);

        let claims = keys.verify(&issued.token).expect("verify");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(TokenKeys::subject(&claims).expect("subject"), user_id);
    }

    #[test]
    fn garbled_token_is_unauthenticated() {
        let keys = keys(3600, 60);
        assert!(matches!(
            keys.verify("not.a.token"),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn different_secret_is_rejected() {
        let signer = keys(3600, 60);
        let verifier = TokenKeys::new(
            &SecretString::from("another-secret".to_string()),
            3600,
            60,
        );
        let issued = signer.issue(Uuid::new_v4()).expect("issue");
        assert!(verifier.verify(&issued.token).is_err());
    }

    #[test]
    fn expired_token_fails_strict_but_refreshes_within_leeway() {
        // TTL of -30 seconds mints an already expired token.
        let keys = keys(-30, 120);
        let issued = keys.issue(Uuid::new_v4()).expect("issue");

        assert!(keys.verify(&issued.token).is_err());
        assert!(keys.verify_for_refresh(&issued.token).is_ok());
    }

    #[test]
    fn expired_past_leeway_fails_refresh() {
        let keys = keys(-3600, 60);
        let issued = keys.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(
            keys.verify_for_refresh(&issued.token),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            iat: 0,
            exp: 0,
        };
        assert!(TokenKeys::subject(&claims).is_err());
    }
}
