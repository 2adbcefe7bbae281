//! Domain error taxonomy for the auth surface.
//!
//! Every variant maps to a terminal response with a stable, user-facing
//! message. Wrong email and wrong password collapse into one variant so the
//! API never confirms whether an account exists. Backend failures are logged
//! and surface as a generic 500 without internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::storage::StoreError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Too many failed attempts, try again in {retry_after_minutes} minutes")]
    Locked { retry_after_minutes: u64 },
    #[error("Bot check failed")]
    BotCheckFailed,
    #[error("Account is disabled")]
    AccountInactive,
    #[error("Current password is incorrect")]
    WrongCurrentPassword,
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredResetToken,
    #[error("Registration is disabled")]
    RegistrationDisabled,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("Internal server error")]
    Internal,
}

/// Stable JSON error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_minutes: Option<u64>,
}

impl AuthFailure {
    /// Log a backend error and collapse it into the generic 500.
    pub fn from_store(err: &StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::Backend(source) => {
                error!("storage backend error: {source:#}");
                Self::Internal
            }
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateEmail
            | Self::BotCheckFailed
            | Self::WrongCurrentPassword
            | Self::InvalidOrExpiredResetToken => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Locked { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::AccountInactive | Self::RegistrationDisabled | Self::Forbidden => {
                StatusCode::FORBIDDEN
            }
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let retry_after_minutes = match self {
            Self::Locked {
                retry_after_minutes,
            } => Some(retry_after_minutes),
            _ => None,
        };
        let body = ErrorBody {
            message: self.to_string(),
            retry_after_minutes,
        };
        (self.status(), Json(body)).into_response()
    }
}
