//! Secondary bot-check verification for login attempts.
//!
//! A failed or missing bot-check token counts against the same throttle
//! counter as a wrong password; see the throttle module for the lockout
//! implications. Network errors fail closed.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotCheckOutcome {
    Passed,
    Failed,
}

#[async_trait]
pub trait BotCheck: Send + Sync {
    async fn verify(&self, token: Option<&str>, client_ip: Option<&str>) -> BotCheckOutcome;
}

/// Used when no bot check is configured; every attempt passes.
#[derive(Clone, Debug)]
pub struct NoopBotCheck;

#[async_trait]
impl BotCheck for NoopBotCheck {
    async fn verify(&self, _token: Option<&str>, _client_ip: Option<&str>) -> BotCheckOutcome {
        BotCheckOutcome::Passed
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
}

/// Verifies challenge tokens against a reCAPTCHA-style siteverify endpoint.
#[derive(Debug)]
pub struct HttpBotCheck {
    http: reqwest::Client,
    verify_url: String,
    secret: SecretString,
}

impl HttpBotCheck {
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(verify_url: String, secret: SecretString) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            verify_url,
            secret,
        })
    }
}

#[async_trait]
impl BotCheck for HttpBotCheck {
    async fn verify(&self, token: Option<&str>, client_ip: Option<&str>) -> BotCheckOutcome {
        let Some(token) = token.filter(|token| !token.trim().is_empty()) else {
            return BotCheckOutcome::Failed;
        };
        let mut form = vec![
            ("secret", self.secret.expose_secret().to_string()),
            ("response", token.to_string()),
        ];
        if let Some(ip) = client_ip {
            form.push(("remoteip", ip.to_string()));
        }
        let response = self
            .http
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match response {
            Ok(response) => match response.json::<SiteVerifyResponse>().await {
                Ok(body) if body.success => BotCheckOutcome::Passed,
                Ok(_) => BotCheckOutcome::Failed,
                Err(err) => {
                    error!("bot check response decode failed: {err}");
                    BotCheckOutcome::Failed
                }
            },
            Err(err) => {
                error!("bot check request failed: {err}");
                BotCheckOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_bot_check_always_passes() {
        let check = NoopBotCheck;
        assert_eq!(
            check.verify(None, None).await,
            BotCheckOutcome::Passed
        );
        assert_eq!(
            check.verify(Some("anything"), Some("1.2.3.4")).await,
            BotCheckOutcome::Passed
        );
    }

    #[tokio::test]
    async fn http_bot_check_fails_without_token() {
        let check = HttpBotCheck::new(
            DEFAULT_VERIFY_URL.to_string(),
            SecretString::from("secret"),
        )
        .expect("client builds");
        assert_eq!(check.verify(None, None).await, BotCheckOutcome::Failed);
        assert_eq!(
            check.verify(Some("   "), None).await,
            BotCheckOutcome::Failed
        );
    }
}
