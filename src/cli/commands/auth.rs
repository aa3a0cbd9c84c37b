use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_verification_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("Secret used to sign and verify access tokens")
                .env("TESSERA_JWT_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("token-ttl-seconds")
                .long("token-ttl-seconds")
                .help("Access token TTL in seconds (also drives the jwt_token cookie Max-Age)")
                .env("TESSERA_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-leeway-seconds")
                .long("refresh-leeway-seconds")
                .help("Expiry leeway allowed when refreshing a token")
                .env("TESSERA_REFRESH_LEEWAY_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_verification_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("link-signing-key")
                .long("link-signing-key")
                .help("HMAC key for signed verification links (defaults to the JWT secret)")
                .env("TESSERA_LINK_SIGNING_KEY"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Public base URL embedded in verification links")
                .env("TESSERA_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new("verify-link-ttl-seconds")
                .long("verify-link-ttl-seconds")
                .help("Signed verification link TTL in seconds")
                .env("TESSERA_VERIFY_LINK_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("default-role")
                .long("default-role")
                .help("Role attached to self-registered users")
                .env("TESSERA_DEFAULT_ROLE")
                .default_value("user"),
        )
}
