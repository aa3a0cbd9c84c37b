use crate::api::{
    self,
    email::LogEmailSender,
    handlers::auth::{AuthConfig, AuthState},
};
use crate::cli::actions::Action;
use anyhow::Result;
use std::sync::Arc;

/// Handle the server action
/// # Errors
/// Returns an error if the server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        dsn,
        jwt_secret,
        link_signing_key,
        base_url,
        token_ttl_seconds,
        refresh_leeway_seconds,
        verify_link_ttl_seconds,
        default_role,
    } = action;

    let config = AuthConfig::new(base_url)
        .with_token_ttl_seconds(token_ttl_seconds)
        .with_refresh_leeway_seconds(refresh_leeway_seconds)
        .with_verify_link_ttl_seconds(verify_link_ttl_seconds)
        .with_default_role(default_role);

    let auth_state = Arc::new(AuthState::new(
        config,
        &jwt_secret,
        &link_signing_key,
        Arc::new(LogEmailSender),
    ));

    api::new(port, dsn, auth_state).await?;

    Ok(())
}
