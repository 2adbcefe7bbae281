//! Credential store: user records and the persistence seam.
//!
//! The rest of the crate talks to an abstract [`UserStore`]; `postgres`
//! implements it with sqlx and `memory` with a mutex-guarded map for tests
//! and local development. Reset-token consumption must be a single
//! compare-and-swap at the store so two racing requests cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Closed set of portal roles. Role gating never string-compares
/// free-form input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            _ => None,
        }
    }
}

/// A stored user row.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
    /// PHC string; `None` for accounts created purely via an external
    /// identity provider.
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub external_id: Option<String>,
    pub reset_token_hash: Option<Vec<u8>>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user row. The email must already be
/// normalized (trimmed, lowercased).
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub external_id: Option<String>,
}

/// Allow-listed profile updates; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("storage backend error")]
    Backend(#[source] anyhow::Error),
}

/// Abstract keyed-record persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;

    /// Record a pending reset: only the token hash is stored, never the raw
    /// token.
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically consume a pending reset token: update the password and
    /// clear both reset fields in one statement guarded by
    /// `reset_token_hash = $hash AND reset_token_expires_at > $now`.
    /// Returns `true` when exactly one row was updated.
    async fn consume_reset_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<bool, StoreError>;

    /// Link an external identity to an existing user, preserving role and
    /// password. The picture is only filled in when the user has none.
    async fn link_external_id(
        &self,
        id: Uuid,
        external_id: &str,
        picture: Option<&str>,
    ) -> Result<Option<UserRecord>, StoreError>;

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), StoreError>;

    /// Backend liveness probe; in-memory stores are always healthy.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_as_uppercase() {
        assert_eq!(Role::Admin.as_str(), "ADMIN");
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse("user"), None);
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn role_serializes_uppercase() {
        let json = serde_json::to_string(&Role::Admin).expect("serialize role");
        assert_eq!(json, "\"ADMIN\"");
        let parsed: Role = serde_json::from_str("\"USER\"").expect("deserialize role");
        assert_eq!(parsed, Role::User);
    }
}
