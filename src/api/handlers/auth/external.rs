//! External identity (OAuth) linking.
//!
//! The provider exchange (authorization code -> verified profile) lives
//! behind [`ExternalProvider`]; [`link_external_profile`] reconciles the
//! verified profile with the credential store:
//!
//! - no local user, registration disabled  -> `RegistrationDisabled`
//! - no local user, registration enabled   -> create (no password, USER)
//! - local user without an external id     -> link, keep role and password
//! - local user inactive                   -> `AccountDisabled`
//!
//! On success the callback issues a session token exactly as standard login
//! would and redirects to the frontend with it.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Redirect},
    Json,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use utoipa::ToSchema;

use super::state::{AuthConfig, AuthState};
use super::types::ExternalStatusResponse;
use crate::storage::{NewUser, Role, StoreError, UserRecord, UserStore};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// A provider-verified identity.
#[derive(Clone, Debug)]
pub struct ExternalProfile {
    pub external_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("registration is disabled")]
    RegistrationDisabled,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("storage error during external link")]
    Store(#[source] StoreError),
}

/// Reconcile a verified external profile with the credential store.
///
/// # Errors
/// Returns a [`LinkError`] per the transitions documented on this module.
pub async fn link_external_profile(
    store: &dyn UserStore,
    config: &AuthConfig,
    profile: ExternalProfile,
) -> Result<UserRecord, LinkError> {
    let email = super::utils::normalize_email(&profile.email);
    let existing = store
        .find_by_email(&email)
        .await
        .map_err(LinkError::Store)?;

    let user = match existing {
        None => {
            if !config.allow_registration() {
                return Err(LinkError::RegistrationDisabled);
            }
            store
                .insert_user(NewUser {
                    email,
                    first_name: profile.first_name,
                    last_name: profile.last_name,
                    picture: profile.picture,
                    password_hash: None,
                    role: Role::User,
                    is_active: true,
                    external_id: Some(profile.external_id),
                })
                .await
                .map_err(LinkError::Store)?
        }
        Some(user) if user.external_id.is_none() => store
            .link_external_id(user.id, &profile.external_id, profile.picture.as_deref())
            .await
            .map_err(LinkError::Store)?
            .unwrap_or(user),
        Some(user) => user,
    };

    if !user.is_active {
        return Err(LinkError::AccountDisabled);
    }
    Ok(user)
}

/// Exchanges an authorization code for a verified profile.
#[async_trait]
pub trait ExternalProvider: Send + Sync {
    /// # Errors
    /// Returns an error when the exchange or profile fetch fails.
    async fn fetch_profile(&self, code: &str) -> Result<ExternalProfile>;
}

/// Placeholder provider used when no OAuth client is configured.
#[derive(Clone, Debug)]
pub struct DisabledProvider;

#[async_trait]
impl ExternalProvider for DisabledProvider {
    async fn fetch_profile(&self, _code: &str) -> Result<ExternalProfile> {
        Err(anyhow!("external auth provider is not configured"))
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    picture: Option<String>,
}

/// Google OAuth code exchange + OpenID userinfo fetch.
pub struct GoogleProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleProvider {
    /// # Errors
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_url: String,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build OAuth HTTP client")?;
        Ok(Self {
            http,
            client_id,
            client_secret,
            redirect_url,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }
}

#[async_trait]
impl ExternalProvider for GoogleProvider {
    async fn fetch_profile(&self, code: &str) -> Result<ExternalProfile> {
        let token: GoogleTokenResponse = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("OAuth token exchange request failed")?
            .error_for_status()
            .context("OAuth token exchange rejected")?
            .json()
            .await
            .context("OAuth token response decode failed")?;

        let info: GoogleUserInfo = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("OAuth userinfo request failed")?
            .error_for_status()
            .context("OAuth userinfo rejected")?
            .json()
            .await
            .context("OAuth userinfo decode failed")?;

        Ok(ExternalProfile {
            external_id: info.sub,
            email: info.email,
            first_name: info.given_name,
            last_name: info.family_name,
            picture: info.picture,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

fn error_redirect(frontend_base_url: &str, code: &str) -> Redirect {
    let base = frontend_base_url.trim_end_matches('/');
    Redirect::to(&format!("{base}/login?error={code}"))
}

#[utoipa::path(
    get,
    path = "/v1/auth/external/status",
    responses(
        (status = 200, description = "External auth availability", body = ExternalStatusResponse)
    ),
    tag = "auth"
)]
pub async fn status(state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    Json(ExternalStatusResponse {
        enabled: state.config().external_auth_enabled(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/auth/external/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from the provider"),
        ("error" = Option<String>, Query, description = "Provider-side error code")
    ),
    responses(
        (status = 303, description = "Redirect to the frontend with a session token or an error code")
    ),
    tag = "auth"
)]
pub async fn callback(
    state: Extension<Arc<AuthState>>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    let config = state.config();
    let frontend = config.frontend_base_url().to_string();

    if !config.external_auth_enabled() {
        return error_redirect(&frontend, "external-auth-disabled");
    }
    if query.error.is_some() {
        return error_redirect(&frontend, "external-auth-failed");
    }
    let Some(code) = query.code.filter(|code| !code.trim().is_empty()) else {
        return error_redirect(&frontend, "external-auth-failed");
    };

    let profile = match state.external_provider().fetch_profile(&code).await {
        Ok(profile) => profile,
        Err(err) => {
            error!("external profile fetch failed: {err:#}");
            return error_redirect(&frontend, "external-auth-failed");
        }
    };

    let user = match link_external_profile(state.store(), &config, profile).await {
        Ok(user) => user,
        Err(LinkError::RegistrationDisabled) => {
            return error_redirect(&frontend, "registration-disabled");
        }
        Err(LinkError::AccountDisabled) => {
            return error_redirect(&frontend, "account-disabled");
        }
        Err(LinkError::Store(err)) => {
            error!("external link storage error: {err:#?}");
            return error_redirect(&frontend, "server-error");
        }
    };

    // Same claims shape as standard login.
    match state
        .signer()
        .issue(user.id, user.role, config.token_ttl())
    {
        Ok(token) => {
            let base = frontend.trim_end_matches('/');
            Redirect::to(&format!("{base}/login/callback?token={token}"))
        }
        Err(err) => {
            error!("token issuance after external login failed: {err}");
            error_redirect(&frontend, "token-generation-failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryUserStore;

    fn profile(email: &str) -> ExternalProfile {
        ExternalProfile {
            external_id: "ext-1".to_string(),
            email: email.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            picture: Some("https://lh3.example.com/p.png".to_string()),
        }
    }

    fn config(allow_registration: bool) -> AuthConfig {
        AuthConfig::new("https://portal.example.com".to_string())
            .with_allow_registration(allow_registration)
            .with_external_auth_enabled(true)
    }

    #[tokio::test]
    async fn creates_user_when_registration_enabled() {
        let store = MemoryUserStore::new();
        let user = link_external_profile(&store, &config(true), profile("new@example.com"))
            .await
            .expect("link should create the user");
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);
        assert!(user.password_hash.is_none());
        assert_eq!(user.external_id.as_deref(), Some("ext-1"));
    }

    #[tokio::test]
    async fn rejects_new_user_when_registration_disabled() {
        let store = MemoryUserStore::new();
        let result =
            link_external_profile(&store, &config(false), profile("new@example.com")).await;
        assert!(matches!(result, Err(LinkError::RegistrationDisabled)));
        // No row was created.
        let found = store
            .find_by_email("new@example.com")
            .await
            .expect("lookup works");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn links_existing_user_preserving_role_and_password() {
        let store = MemoryUserStore::new();
        let existing = store
            .insert_user(NewUser {
                email: "admin@example.com".to_string(),
                first_name: "Root".to_string(),
                last_name: "Admin".to_string(),
                picture: None,
                password_hash: Some("$argon2id$existing".to_string()),
                role: Role::Admin,
                is_active: true,
                external_id: None,
            })
            .await
            .expect("insert works");

        let linked = link_external_profile(&store, &config(true), profile("admin@example.com"))
            .await
            .expect("link should succeed");
        assert_eq!(linked.id, existing.id);
        assert_eq!(linked.role, Role::Admin);
        assert_eq!(linked.password_hash.as_deref(), Some("$argon2id$existing"));
        assert_eq!(linked.external_id.as_deref(), Some("ext-1"));
    }

    #[tokio::test]
    async fn rejects_inactive_user() {
        let store = MemoryUserStore::new();
        let user = store
            .insert_user(NewUser {
                email: "gone@example.com".to_string(),
                first_name: "Former".to_string(),
                last_name: "User".to_string(),
                picture: None,
                password_hash: None,
                role: Role::User,
                is_active: false,
                external_id: Some("ext-1".to_string()),
            })
            .await
            .expect("insert works");

        let result = link_external_profile(&store, &config(true), profile("gone@example.com")).await;
        assert!(matches!(result, Err(LinkError::AccountDisabled)));
        drop(user);
    }

    #[tokio::test]
    async fn already_linked_user_passes_through() {
        let store = MemoryUserStore::new();
        store
            .insert_user(NewUser {
                email: "linked@example.com".to_string(),
                first_name: "Al".to_string(),
                last_name: "Ready".to_string(),
                picture: None,
                password_hash: None,
                role: Role::User,
                is_active: true,
                external_id: Some("ext-other".to_string()),
            })
            .await
            .expect("insert works");

        let user = link_external_profile(&store, &config(true), profile("linked@example.com"))
            .await
            .expect("link should pass through");
        // Existing linkage is preserved, not overwritten.
        assert_eq!(user.external_id.as_deref(), Some("ext-other"));
    }
}
