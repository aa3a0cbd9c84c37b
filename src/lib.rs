//! # Tessera (Authentication & Authorization)
//!
//! `tessera` issues and validates bearer credentials, manages the lifecycle
//! of email-verification tokens, and gates access by role.
//!
//! ## Authentication
//!
//! Login exchanges an email/password pair for a signed, time-limited JWT.
//! The token is returned both in the response body and as the `jwt_token`
//! cookie; a single configured TTL drives both so the two never drift apart.
//!
//! > **Note:** tokens are stateless. Logout ends the current authenticated
//! > context and clears the cookie, but a previously issued token remains
//! > verifiable until it expires. Revoking outstanding copies would require
//! > an external denylist, which this service does not carry.
//!
//! ## Email verification
//!
//! Each unverified user holds at most one live verification token. Links
//! embed the token, the caller-supplied redirect target, and an expiry,
//! all bound by an HMAC signature. Consuming a link is a single atomic
//! update: the first consumer wins, concurrent retries observe the token
//! as already cleared.
//!
//! ## Authorization
//!
//! Role names are resolved from the database at check time, never from
//! token claims, so a revoked role takes effect on the next request.

pub mod api;
pub mod cli;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
