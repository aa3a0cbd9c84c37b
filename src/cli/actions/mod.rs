pub mod server;

use secrecy::SecretString;

/// Actions the CLI can dispatch.
#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        jwt_secret: SecretString,
        link_signing_key: SecretString,
        base_url: String,
        token_ttl_seconds: i64,
        refresh_leeway_seconds: u64,
        verify_link_ttl_seconds: i64,
        default_role: String,
    },
}
