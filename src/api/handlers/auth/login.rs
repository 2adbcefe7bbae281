//! Login endpoint: throttle gate, bot check, credential verification, token
//! issuance.
//!
//! Order matters: admission is checked before anything touches credentials,
//! and every failure channel (bot check, unknown email, wrong password)
//! records against the same client key so none of them bypasses the lockout.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use super::bot_check::BotCheckOutcome;
use super::error::AuthFailure;
use super::password::verify_password;
use super::state::AuthState;
use super::throttle::{retry_after_minutes, Admission};
use super::types::{LoginRequest, LoginResponse, UserSummary};
use super::utils::{extract_client_ip, normalize_email};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponse),
        (status = 400, description = "Bot check failed", body = super::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = super::error::ErrorBody),
        (status = 403, description = "Account disabled", body = super::error::ErrorBody),
        (status = 429, description = "Locked out after repeated failures", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let client_key = extract_client_ip(&headers).unwrap_or_else(|| "unknown".to_string());

    // A locked decision must not touch the counter.
    if let Admission::Locked { retry_after } = state.throttle().check_admission(&client_key) {
        return AuthFailure::Locked {
            retry_after_minutes: retry_after_minutes(retry_after),
        }
        .into_response();
    }

    let config = state.config();
    if config.bot_check_enabled() {
        let outcome = state
            .bot_check()
            .verify(payload.bot_check_token.as_deref(), Some(&client_key))
            .await;
        if outcome == BotCheckOutcome::Failed {
            state.throttle().record_failure(&client_key);
            return AuthFailure::BotCheckFailed.into_response();
        }
    }

    let email = normalize_email(&payload.email);
    let user = match state.store().find_by_email(&email).await {
        Ok(user) => user,
        Err(err) => return AuthFailure::from_store(&err).into_response(),
    };
    // Unknown email and wrong password give the same answer so the API
    // never confirms whether an account exists.
    let Some(user) = user else {
        state.throttle().record_failure(&client_key);
        return AuthFailure::InvalidCredentials.into_response();
    };
    if !user.is_active {
        return AuthFailure::AccountInactive.into_response();
    }
    let password_matches = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&payload.password, hash));
    if !password_matches {
        state.throttle().record_failure(&client_key);
        return AuthFailure::InvalidCredentials.into_response();
    }

    state.throttle().record_success(&client_key);

    match state
        .signer()
        .issue(user.id, user.role, config.token_ttl())
    {
        Ok(token) => {
            info!(user_id = %user.id, "login succeeded");
            (
                StatusCode::OK,
                Json(LoginResponse {
                    token,
                    user: UserSummary::from_record(&user),
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("token issuance failed: {err}");
            AuthFailure::Internal.into_response()
        }
    }
}
