//! Outbound email delivery abstraction.
//!
//! Verification flows hand a message to an `EmailSender` on a spawned task so
//! the HTTP response never waits on (or fails because of) delivery. A failed
//! send is logged and dropped; the caller can always request a fresh link.
//!
//! The default sender for local dev is `LogEmailSender`, which logs and
//! returns `Ok(())`. Production deployments implement `EmailSender` against
//! their SMTP relay or delivery API.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery abstraction used by the verification handlers.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to have it logged.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

/// Fire-and-forget delivery: spawn the send so issuance never blocks on it.
pub fn dispatch(sender: Arc<dyn EmailSender>, message: EmailMessage) {
    tokio::spawn(async move {
        if let Err(err) = sender.send(&message) {
            error!(to_email = %message.to_email, "email delivery failed: {err}");
        }
    });
}

/// Build the verification message around a signed link.
#[must_use]
pub fn verification_message(to_email: &str, verify_url: &str) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Verify your email address".to_string(),
        body: format!("Follow this link to verify your email address: {verify_url}"),
    }
}
