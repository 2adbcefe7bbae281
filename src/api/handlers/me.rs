//! Authenticated self-service endpoints.
//!
//! Every handler starts from the bearer-token gate, then reads or writes the
//! caller's own record. Profile updates are allow-listed; email and role are
//! not editable here.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::error::AuthFailure;
use super::auth::password::{hash_password, verify_password};
use super::auth::principal::require_auth;
use super::auth::types::{ChangePasswordRequest, MessageResponse, UpdateProfileRequest, UserSummary};
use super::auth::AuthState;
use crate::storage::ProfileUpdate;

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "Authenticated user profile", body = UserSummary),
        (status = 401, description = "Missing or invalid token", body = super::auth::error::ErrorBody),
        (status = 403, description = "Account disabled", body = super::auth::error::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn get_me(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    match state.store().find_by_id(principal.user_id).await {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(UserSummary::from_record(&record))).into_response()
        }
        Ok(None) => AuthFailure::Unauthorized.into_response(),
        Err(err) => AuthFailure::from_store(&err).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/v1/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserSummary),
        (status = 401, description = "Missing or invalid token", body = super::auth::error::ErrorBody),
        (status = 422, description = "No updatable fields provided", body = super::auth::error::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn update_me(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Response {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let update = ProfileUpdate {
        first_name: normalize_optional(payload.first_name),
        last_name: normalize_optional(payload.last_name),
        picture: normalize_optional(payload.picture),
    };
    if update.first_name.is_none() && update.last_name.is_none() && update.picture.is_none() {
        return AuthFailure::InvalidRequest("No updates provided").into_response();
    }

    match state.store().update_profile(principal.user_id, update).await {
        Ok(Some(record)) => {
            (StatusCode::OK, Json(UserSummary::from_record(&record))).into_response()
        }
        Ok(None) => AuthFailure::Unauthorized.into_response(),
        Err(err) => AuthFailure::from_store(&err).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/v1/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password does not match", body = super::auth::error::ErrorBody),
        (status = 422, description = "New password rejected by policy", body = super::auth::error::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "me"
)]
pub async fn change_password(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Response {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };

    let user = match state.store().find_by_id(principal.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthFailure::Unauthorized.into_response(),
        Err(err) => return AuthFailure::from_store(&err).into_response(),
    };

    // External-only accounts have no password to verify against.
    let current_matches = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&payload.current_password, hash));
    if !current_matches {
        return AuthFailure::WrongCurrentPassword.into_response();
    }

    let Ok(new_hash) = hash_password(&payload.new_password) else {
        return AuthFailure::InvalidRequest("Password must be 8 to 128 characters")
            .into_response();
    };
    match state.store().update_password(user.id, &new_hash).await {
        Ok(()) => {
            info!(user_id = %user.id, "password changed");
            (
                StatusCode::OK,
                Json(MessageResponse::new("Password updated")),
            )
                .into_response()
        }
        Err(err) => AuthFailure::from_store(&err).into_response(),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_optional_drops_blank_values() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(
            normalize_optional(Some("  Ada ".to_string())),
            Some("Ada".to_string())
        );
    }
}
