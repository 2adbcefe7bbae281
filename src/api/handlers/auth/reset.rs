//! Password reset: one-time token request and consumption.
//!
//! The request path answers identically whether or not the email exists, and
//! only a hash of the token is ever persisted. Consumption is a single
//! conditional update at the store, so a token can be spent exactly once.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

use super::error::AuthFailure;
use super::password::hash_password;
use super::state::AuthState;
use super::types::{MessageResponse, PasswordResetRequest, PasswordResetSubmit};
use super::utils::{build_reset_url, generate_reset_token, hash_reset_token, normalize_email};
use crate::api::email::ResetEmail;

const GENERIC_RESET_MESSAGE: &str = "If the email is registered, a reset link has been sent";

#[utoipa::path(
    post,
    path = "/v1/auth/password-reset-request",
    request_body = PasswordResetRequest,
    responses(
        (status = 202, description = "Generic acknowledgement, sent whether or not the email exists", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn request_reset(
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Response {
    let email = normalize_email(&payload.email);
    let user = match state.store().find_by_email(&email).await {
        Ok(user) => user,
        Err(err) => return AuthFailure::from_store(&err).into_response(),
    };

    if let Some(user) = user {
        let raw_token = match generate_reset_token() {
            Ok(token) => token,
            Err(err) => {
                error!("reset token generation failed: {err:#}");
                return AuthFailure::Internal.into_response();
            }
        };
        let config = state.config();
        let expires_at = Utc::now() + config.reset_token_ttl();
        if let Err(err) = state
            .store()
            .set_reset_token(user.id, &hash_reset_token(&raw_token), expires_at)
            .await
        {
            return AuthFailure::from_store(&err).into_response();
        }

        // The raw token only travels inside this URL; delivery failures are
        // logged and the response stays generic.
        let email = ResetEmail {
            to_email: user.email,
            reset_url: build_reset_url(config.frontend_base_url(), &raw_token),
        };
        if let Err(err) = state.mailer().send(&email) {
            error!("reset email delivery failed: {err:#}");
        }
    }

    (
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(GENERIC_RESET_MESSAGE)),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/password-reset",
    request_body = PasswordResetSubmit,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token", body = super::error::ErrorBody),
        (status = 422, description = "Password policy rejected", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn consume_reset(
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<PasswordResetSubmit>,
) -> Response {
    let Ok(new_password_hash) = hash_password(&payload.password) else {
        return AuthFailure::InvalidRequest("Password must be 8 to 128 characters")
            .into_response();
    };

    let token_hash = hash_reset_token(&payload.token);
    match state
        .store()
        .consume_reset_token(&token_hash, Utc::now(), &new_password_hash)
        .await
    {
        // Wrong and expired tokens are indistinguishable to the caller.
        Ok(false) => AuthFailure::InvalidOrExpiredResetToken.into_response(),
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse::new("Password has been reset")),
        )
            .into_response(),
        Err(err) => AuthFailure::from_store(&err).into_response(),
    }
}
