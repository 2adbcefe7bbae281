use crate::api::{self, handlers::auth, LogMailer, ResetMailer, ServerDeps};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,
    pub allow_registration: bool,
    pub external_auth_enabled: bool,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<SecretString>,
    pub google_redirect_url: Option<String>,
    pub bot_check_secret: Option<SecretString>,
    pub bot_check_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the dependencies cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    // The login bot check is on exactly when a verifier secret is configured.
    let bot_check_enabled = args.bot_check_secret.is_some();
    let bot_check: Arc<dyn auth::BotCheck> = match args.bot_check_secret {
        Some(secret) => Arc::new(auth::HttpBotCheck::new(args.bot_check_url, secret)?),
        None => Arc::new(auth::NoopBotCheck),
    };

    let external_provider: Arc<dyn auth::ExternalProvider> = match (
        args.google_client_id,
        args.google_client_secret,
        args.google_redirect_url,
    ) {
        (Some(client_id), Some(client_secret), Some(redirect_url)) => Arc::new(
            auth::GoogleProvider::new(client_id, client_secret, redirect_url)?,
        ),
        (None, None, None) => Arc::new(auth::DisabledProvider),
        _ => return Err(anyhow!("incomplete Google OAuth configuration")),
    };

    let config = auth::AuthConfig::new(args.frontend_base_url)
        .with_token_ttl_seconds(args.session_ttl_seconds)
        .with_reset_token_ttl_seconds(args.reset_ttl_seconds)
        .with_allow_registration(args.allow_registration)
        .with_external_auth_enabled(args.external_auth_enabled)
        .with_bot_check_enabled(bot_check_enabled);

    let mailer: Arc<dyn ResetMailer> = Arc::new(LogMailer);

    api::new(
        args.port,
        args.dsn,
        ServerDeps {
            config,
            signer: auth::TokenSigner::new(args.token_secret),
            throttle_config: auth::ThrottleConfig::default(),
            mailer,
            bot_check,
            external_provider,
        },
    )
    .await
}
