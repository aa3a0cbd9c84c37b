//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;

use crate::api::email::EmailSender;

use super::signing::LinkSigner;
use super::token::TokenKeys;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_REFRESH_LEEWAY_SECONDS: u64 = 60;
const DEFAULT_VERIFY_LINK_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_ROLE: &str = "user";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    token_ttl_seconds: i64,
    refresh_leeway_seconds: u64,
    verify_link_ttl_seconds: i64,
    default_role: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            refresh_leeway_seconds: DEFAULT_REFRESH_LEEWAY_SECONDS,
            verify_link_ttl_seconds: DEFAULT_VERIFY_LINK_TTL_SECONDS,
            default_role: DEFAULT_ROLE.to_string(),
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_leeway_seconds(mut self, seconds: u64) -> Self {
        self.refresh_leeway_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verify_link_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verify_link_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_default_role(mut self, role: String) -> Self {
        self.default_role = role;
        self
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One TTL drives both the JWT expiry and the cookie Max-Age so the two
    /// carriers never drift apart.
    pub(super) fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    pub(super) fn refresh_leeway_seconds(&self) -> u64 {
        self.refresh_leeway_seconds
    }

    pub(super) fn verify_link_ttl_seconds(&self) -> i64 {
        self.verify_link_ttl_seconds
    }

    pub(super) fn default_role(&self) -> &str {
        &self.default_role
    }

    pub(super) fn cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    token_keys: TokenKeys,
    link_signer: LinkSigner,
    email_sender: Arc<dyn EmailSender>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        jwt_secret: &SecretString,
        link_signing_key: &SecretString,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        let token_keys = TokenKeys::new(
            jwt_secret,
            config.token_ttl_seconds(),
            config.refresh_leeway_seconds(),
        );
        let link_signer = LinkSigner::new(link_signing_key);
        Self {
            config,
            token_keys,
            link_signer,
            email_sender,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn token_keys(&self) -> &TokenKeys {
        &self.token_keys
    }

    pub(super) fn link_signer(&self) -> &LinkSigner {
        &self.link_signer
    }

    pub(super) fn email_sender(&self) -> Arc<dyn EmailSender> {
        self.email_sender.clone()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::LogEmailSender;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://auth.example.com".to_string());

        assert_eq!(config.base_url(), "https://auth.example.com");
        assert_eq!(config.token_ttl_seconds(), super::DEFAULT_TOKEN_TTL_SECONDS);
        assert_eq!(
            config.refresh_leeway_seconds(),
            super::DEFAULT_REFRESH_LEEWAY_SECONDS
        );
        assert_eq!(
            config.verify_link_ttl_seconds(),
            super::DEFAULT_VERIFY_LINK_TTL_SECONDS
        );
        assert_eq!(config.default_role(), "user");
        assert!(config.cookie_secure());

        let config = config
            .with_token_ttl_seconds(120)
            .with_refresh_leeway_seconds(5)
            .with_verify_link_ttl_seconds(300)
            .with_default_role("member".to_string());

        assert_eq!(config.token_ttl_seconds(), 120);
        assert_eq!(config.refresh_leeway_seconds(), 5);
        assert_eq!(config.verify_link_ttl_seconds(), 300);
        assert_eq!(config.default_role(), "member");
    }

    #[test]
    fn plain_http_base_url_is_not_cookie_secure() {
        let config = AuthConfig::new("http://localhost:8080".to_string());
        assert!(!config.cookie_secure());
    }

    #[test]
    fn auth_state_exposes_config() {
        let config = AuthConfig::new("https://auth.example.com".to_string());
        let state = AuthState::new(
            config,
            &SecretString::from("jwt".to_string()),
            &SecretString::from("link".to_string()),
            Arc::new(LogEmailSender),
        );
        assert_eq!(state.config().base_url(), "https://auth.example.com");
        assert_eq!(state.token_keys().ttl_seconds(), 3600);
    }
}
