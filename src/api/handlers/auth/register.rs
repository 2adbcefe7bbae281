//! Registration endpoint.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::error::AuthFailure;
use super::password::hash_password;
use super::state::AuthState;
use super::types::{RegisterRequest, RegisterResponse, UserSummary};
use super::utils::{normalize_email, valid_email};
use crate::storage::{NewUser, Role};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Email already registered", body = super::error::ErrorBody),
        (status = 403, description = "Registration disabled", body = super::error::ErrorBody),
        (status = 422, description = "Invalid email or password", body = super::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let config = state.config();
    if !config.allow_registration() {
        return AuthFailure::RegistrationDisabled.into_response();
    }

    let email = normalize_email(&payload.email);
    if !valid_email(&email) {
        return AuthFailure::InvalidRequest("Invalid email address").into_response();
    }
    let Ok(password_hash) = hash_password(&payload.password) else {
        return AuthFailure::InvalidRequest("Password must be 8 to 128 characters")
            .into_response();
    };

    // Self-service registration always yields a regular user; only an
    // existing admin can promote accounts.
    let user = NewUser {
        email,
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        picture: None,
        password_hash: Some(password_hash),
        role: Role::User,
        is_active: true,
        external_id: None,
    };
    match state.store().insert_user(user).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                message: "User registered".to_string(),
                user: UserSummary::from_record(&record),
            }),
        )
            .into_response(),
        Err(err) => AuthFailure::from_store(&err).into_response(),
    }
}
