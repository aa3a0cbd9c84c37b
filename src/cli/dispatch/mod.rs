//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .cloned()
        .context("missing required argument: --jwt-secret")?;

    // Links fall back to the JWT secret so a single-secret deployment works.
    let link_signing_key = matches
        .get_one::<String>("link-signing-key")
        .cloned()
        .unwrap_or_else(|| jwt_secret.clone());

    let base_url = matches
        .get_one::<String>("base-url")
        .cloned()
        .context("missing required argument: --base-url")?;

    let token_ttl_seconds = matches
        .get_one::<i64>("token-ttl-seconds")
        .copied()
        .unwrap_or(3600);
    let refresh_leeway_seconds = matches
        .get_one::<u64>("refresh-leeway-seconds")
        .copied()
        .unwrap_or(60);
    let verify_link_ttl_seconds = matches
        .get_one::<i64>("verify-link-ttl-seconds")
        .copied()
        .unwrap_or(3600);
    let default_role = matches
        .get_one::<String>("default-role")
        .cloned()
        .unwrap_or_else(|| "user".to_string());

    Ok(Action::Server {
        port,
        dsn,
        jwt_secret: SecretString::from(jwt_secret),
        link_signing_key: SecretString::from(link_signing_key),
        base_url,
        token_ttl_seconds,
        refresh_leeway_seconds,
        verify_link_ttl_seconds,
        default_role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_args() {
        temp_env::with_vars([("TESSERA_LINK_SIGNING_KEY", None::<&str>)], || {
            let command = commands::new();
            let matches = command.get_matches_from(vec![
                "tessera",
                "--dsn",
                "postgres://localhost:5432/tessera",
                "--jwt-secret",
                "jwt-secret",
                "--token-ttl-seconds",
                "120",
            ]);
            let action = handler(&matches).expect("server action");
            let Action::Server {
                port,
                dsn,
                jwt_secret,
                link_signing_key,
                token_ttl_seconds,
                default_role,
                ..
            } = action;
            assert_eq!(port, 8080);
            assert_eq!(dsn, "postgres://localhost:5432/tessera");
            assert_eq!(jwt_secret.expose_secret(), "jwt-secret");
            // Falls back to the JWT secret when no dedicated key is given.
            assert_eq!(link_signing_key.expose_secret(), "jwt-secret");
            assert_eq!(token_ttl_seconds, 120);
            assert_eq!(default_role, "user");
        });
    }

    #[test]
    fn dedicated_link_signing_key_wins() {
        let command = commands::new();
        let matches = command.get_matches_from(vec![
            "tessera",
            "--dsn",
            "postgres://localhost:5432/tessera",
            "--jwt-secret",
            "jwt-secret",
            "--link-signing-key",
            "link-key",
        ]);
        let action = handler(&matches).expect("server action");
        let Action::Server {
            link_signing_key, ..
        } = action;
        assert_eq!(link_signing_key.expose_secret(), "link-key");
    }
}
