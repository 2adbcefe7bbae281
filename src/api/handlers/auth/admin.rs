//! Admin-only runtime toggles.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::principal::{require_auth, require_role};
use super::state::AuthState;
use super::types::{ExternalStatusResponse, ExternalToggleRequest};
use crate::storage::Role;

#[utoipa::path(
    put,
    path = "/v1/auth/external/toggle",
    request_body = ExternalToggleRequest,
    responses(
        (status = 200, description = "New external-auth state", body = ExternalStatusResponse),
        (status = 401, description = "Missing or invalid token", body = super::error::ErrorBody),
        (status = 403, description = "Caller is not an admin", body = super::error::ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn toggle_external(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    Json(payload): Json<ExternalToggleRequest>,
) -> Response {
    let principal = match require_auth(&headers, &state).await {
        Ok(principal) => principal,
        Err(failure) => return failure.into_response(),
    };
    if let Err(failure) = require_role(&principal, &[Role::Admin]) {
        return failure.into_response();
    }

    let config = state.reconfigure(|config| {
        config.set_external_auth_enabled(payload.enabled);
    });
    info!(
        admin = %principal.email,
        enabled = config.external_auth_enabled(),
        "external auth toggled"
    );

    (
        StatusCode::OK,
        Json(ExternalStatusResponse {
            enabled: config.external_auth_enabled(),
        }),
    )
        .into_response()
}
