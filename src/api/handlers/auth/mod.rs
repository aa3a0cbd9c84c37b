//! Auth handlers and supporting modules.
//!
//! This module coordinates credential verification, token issuance and
//! refresh, the email-verification token lifecycle, and role-gated access.
//!
//! ## Token model
//!
//! Access tokens are stateless HS256 JWTs carrying `{sub, iat, exp}`. They
//! are verifiable offline; logout clears the `jwt_token` cookie but cannot
//! retract copies already issued. Refresh accepts a token whose expiry is in
//! the future or within a small configured leeway window.
//!
//! ## Verification tokens
//!
//! A user holds at most one live verification token. Issuing a new one
//! (registration, send, resend) immediately invalidates the previous token.
//! Links are signed with HMAC-SHA256 over the token, the redirect target,
//! and the expiry; a tampered or expired link rotates the token and surfaces
//! a fresh link rather than failing the user.

pub(crate) mod login;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod session;
pub(crate) mod storage;
pub(crate) mod verification;

mod error;
mod password;
mod signing;
pub(crate) mod state;
mod token;
mod types;
mod utils;

#[cfg(test)]
mod tests;

pub use error::{AuthError, ValidationErrors};
pub use state::{AuthConfig, AuthState};
pub use storage::UserRecord;
pub use types::UserResponse;
