//! Reset-mail delivery abstraction.
//!
//! The reset flow hands the raw token (inside a frontend URL) to a
//! [`ResetMailer`]; the transport itself (SMTP, API, queue) lives behind the
//! trait. The default sender for local dev is [`LogMailer`], which records
//! only the recipient: the raw token must never end up in any log line.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct ResetEmail {
    pub to_email: String,
    /// `<frontend>/reset-password/<rawToken>`; treated as a secret.
    pub reset_url: String,
}

pub trait ResetMailer: Send + Sync {
    /// Deliver the reset link or return an error.
    ///
    /// # Errors
    /// Returns an error when delivery fails; the caller logs and still
    /// responds generically.
    fn send(&self, email: &ResetEmail) -> Result<()>;
}

/// Local dev sender: logs that a reset was queued, without the link.
#[derive(Clone, Debug)]
pub struct LogMailer;

impl ResetMailer for LogMailer {
    fn send(&self, email: &ResetEmail) -> Result<()> {
        info!(to_email = %email.to_email, "password reset email queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_mailer_accepts_messages() {
        let mailer = LogMailer;
        let email = ResetEmail {
            to_email: "user@example.com".to_string(),
            reset_url: "https://portal.example.com/reset-password/raw".to_string(),
        };
        assert!(mailer.send(&email).is_ok());
    }
}
