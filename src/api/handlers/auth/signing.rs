//! Signed verification links.
//!
//! A link binds `{verification_token, redirect_url, expiry}` with an
//! HMAC-SHA256 signature, so validity is checked purely from the URL at
//! consumption time; nothing is stored. The redirect target is embedded as a
//! percent-encoded path segment and the signature covers its decoded form.

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::utils::encode_path_segment;

type HmacSha256 = Hmac<Sha256>;

pub(super) struct LinkSigner {
    key: Vec<u8>,
}

impl LinkSigner {
    pub(super) fn new(key: &SecretString) -> Self {
        Self {
            key: key.expose_secret().as_bytes().to_vec(),
        }
    }

    /// Build the signed link for a verification token and redirect target.
    pub(super) fn build_link(
        &self,
        base_url: &str,
        token: &str,
        redirect_url: &str,
        expires_at: DateTime<Utc>,
    ) -> String {
        let base = base_url.trim_end_matches('/');
        let expires = expires_at.timestamp();
        let signature = self.signature(token, redirect_url, expires);
        format!(
            "{base}/auth/verify-email/{token}/{redirect}?expires={expires}&signature={signature}",
            redirect = encode_path_segment(redirect_url),
        )
    }

    /// Signature over the decoded redirect target, the token, and the expiry.
    pub(super) fn signature(&self, token: &str, redirect_url: &str, expires: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(token.as_bytes());
        mac.update(b"|");
        mac.update(redirect_url.as_bytes());
        mac.update(b"|");
        mac.update(expires.to_string().as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Check signature and expiry for a presented link. Constant-time on the
    /// signature comparison.
    pub(super) fn verify(
        &self,
        token: &str,
        redirect_url: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if expires < now.timestamp() {
            return false;
        }
        let Ok(presented) =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(signature.as_bytes())
        else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(token.as_bytes());
        mac.update(b"|");
        mac.update(redirect_url.as_bytes());
        mac.update(b"|");
        mac.update(expires.to_string().as_bytes());
        mac.verify_slice(&presented).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer() -> LinkSigner {
        LinkSigner::new(&SecretString::from("link-signing-key".to_string()))
    }

    #[test]
    fn build_link_embeds_token_redirect_and_expiry() {
        let expires_at = Utc::now() + Duration::minutes(60);
        let link = signer().build_link(
            "https://auth.example.com/",
            "the-token",
            "https://app.example.com/home",
            expires_at,
        );
        assert!(link.starts_with(
            "https://auth.example.com/auth/verify-email/the-token/https%3A%2F%2Fapp.example.com%2Fhome?expires="
        ));
        assert!(link.contains("&signature="));
    }

    #[test]
    fn signature_round_trip() {
        let signer = signer();
        let now = Utc::now();
        let expires = (now + Duration::minutes(60)).timestamp();
        let signature = signer.signature("tok", "https://app.example.com", expires);
        assert!(signer.verify("tok", "https://app.example.com", expires, &signature, now));
    }

    #[test]
    fn tampered_redirect_is_rejected() {
        let signer = signer();
        let now = Utc::now();
        let expires = (now + Duration::minutes(60)).timestamp();
        let signature = signer.signature("tok", "https://app.example.com", expires);
        assert!(!signer.verify("tok", "https://evil.example.com", expires, &signature, now));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = signer();
        let now = Utc::now();
        let expires = (now + Duration::minutes(60)).timestamp();
        let signature = signer.signature("tok", "https://app.example.com", expires);
        assert!(!signer.verify("other", "https://app.example.com", expires, &signature, now));
    }

    #[test]
    fn expired_link_is_rejected_even_with_valid_signature() {
        let signer = signer();
        let now = Utc::now();
        let expires = (now - Duration::minutes(1)).timestamp();
        let signature = signer.signature("tok", "https://app.example.com", expires);
        assert!(!signer.verify("tok", "https://app.example.com", expires, &signature, now));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let signer = signer();
        let now = Utc::now();
        let expires = (now + Duration::minutes(60)).timestamp();
        assert!(!signer.verify("tok", "https://app.example.com", expires, "!!!", now));
        assert!(!signer.verify("tok", "https://app.example.com", expires, "", now));
    }

    #[test]
    fn different_keys_disagree() {
        let a = signer();
        let b = LinkSigner::new(&SecretString::from("another-key".to_string()));
        let now = Utc::now();
        let expires = (now + Duration::minutes(60)).timestamp();
        let signature = a.signature("tok", "https://app.example.com", expires);
        assert!(!b.verify("tok", "https://app.example.com", expires, &signature, now));
    }
}
