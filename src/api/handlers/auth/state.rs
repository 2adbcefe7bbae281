//! Auth configuration snapshot and shared state.
//!
//! `AuthConfig` is an explicit snapshot object handed to the components that
//! need it; runtime changes (the admin toggle) go through
//! [`AuthState::reconfigure`] instead of mutating ambient process state.

use chrono::Duration;
use std::sync::{Arc, PoisonError, RwLock};

use super::bot_check::BotCheck;
use super::external::ExternalProvider;
use super::throttle::LoginThrottle;
use super::token::TokenSigner;
use crate::api::email::ResetMailer;
use crate::storage::UserStore;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    token_ttl_seconds: i64,
    reset_token_ttl_seconds: i64,
    allow_registration: bool,
    external_auth_enabled: bool,
    bot_check_enabled: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            allow_registration: true,
            external_auth_enabled: false,
            bot_check_enabled: false,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_allow_registration(mut self, allow: bool) -> Self {
        self.allow_registration = allow;
        self
    }

    #[must_use]
    pub fn with_external_auth_enabled(mut self, enabled: bool) -> Self {
        self.external_auth_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_bot_check_enabled(mut self, enabled: bool) -> Self {
        self.bot_check_enabled = enabled;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_seconds)
    }

    #[must_use]
    pub fn reset_token_ttl(&self) -> Duration {
        Duration::seconds(self.reset_token_ttl_seconds)
    }

    #[must_use]
    pub const fn allow_registration(&self) -> bool {
        self.allow_registration
    }

    #[must_use]
    pub const fn external_auth_enabled(&self) -> bool {
        self.external_auth_enabled
    }

    pub fn set_external_auth_enabled(&mut self, enabled: bool) {
        self.external_auth_enabled = enabled;
    }

    #[must_use]
    pub const fn bot_check_enabled(&self) -> bool {
        self.bot_check_enabled
    }
}

/// Shared auth state handed to handlers via `Extension`.
pub struct AuthState {
    config: RwLock<AuthConfig>,
    store: Arc<dyn UserStore>,
    signer: TokenSigner,
    throttle: Arc<LoginThrottle>,
    mailer: Arc<dyn ResetMailer>,
    bot_check: Arc<dyn BotCheck>,
    external_provider: Arc<dyn ExternalProvider>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        signer: TokenSigner,
        throttle: Arc<LoginThrottle>,
        mailer: Arc<dyn ResetMailer>,
        bot_check: Arc<dyn BotCheck>,
        external_provider: Arc<dyn ExternalProvider>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            store,
            signer,
            throttle,
            mailer,
            bot_check,
            external_provider,
        }
    }

    /// A point-in-time copy of the configuration; handlers work with the
    /// snapshot for the whole request.
    #[must_use]
    pub fn config(&self) -> AuthConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a configuration change atomically.
    pub fn reconfigure(&self, apply: impl FnOnce(&mut AuthConfig)) -> AuthConfig {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut config);
        config.clone()
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn throttle(&self) -> &LoginThrottle {
        self.throttle.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn ResetMailer {
        self.mailer.as_ref()
    }

    #[must_use]
    pub fn bot_check(&self) -> &dyn BotCheck {
        self.bot_check.as_ref()
    }

    #[must_use]
    pub fn external_provider(&self) -> &dyn ExternalProvider {
        self.external_provider.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AuthConfig::new("https://portal.example.com".to_string());
        assert_eq!(config.token_ttl(), Duration::hours(24));
        assert_eq!(config.reset_token_ttl(), Duration::hours(1));
        assert!(config.allow_registration());
        assert!(!config.external_auth_enabled());
        assert!(!config.bot_check_enabled());
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new("https://portal.example.com".to_string())
            .with_token_ttl_seconds(60)
            .with_reset_token_ttl_seconds(120)
            .with_allow_registration(false)
            .with_external_auth_enabled(true)
            .with_bot_check_enabled(true);
        assert_eq!(config.token_ttl(), Duration::seconds(60));
        assert_eq!(config.reset_token_ttl(), Duration::seconds(120));
        assert!(!config.allow_registration());
        assert!(config.external_auth_enabled());
        assert!(config.bot_check_enabled());
    }
}
