//! In-memory [`UserStore`] used by tests and local development.
//!
//! A single mutex serializes every operation, which also gives the
//! reset-token consumption its required atomicity: the lookup and the update
//! happen under one lock acquisition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use super::{NewUser, ProfileUpdate, StoreError, UserRecord, UserStore};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, UserRecord>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.lock();
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            picture: user.picture,
            password_hash: user.password_hash,
            role: user.role,
            is_active: user.is_active,
            external_id: user.external_id,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .lock()
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut users = self.lock();
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(picture) = update.picture {
            user.picture = Some(picture);
        }
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        if let Some(user) = self.lock().get_mut(&id) {
            user.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(user) = self.lock().get_mut(&id) {
            user.reset_token_hash = Some(token_hash.to_vec());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.lock();
        let matching = users.values_mut().find(|user| {
            user.reset_token_hash.as_deref() == Some(token_hash)
                && user.reset_token_expires_at.is_some_and(|expiry| expiry > now)
        });
        let Some(user) = matching else {
            return Ok(false);
        };
        user.password_hash = Some(new_password_hash.to_string());
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        Ok(true)
    }

    async fn link_external_id(
        &self,
        id: Uuid,
        external_id: &str,
        picture: Option<&str>,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut users = self.lock();
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.external_id = Some(external_id.to_string());
        if user.picture.is_none() {
            user.picture = picture.map(str::to_string);
        }
        Ok(Some(user.clone()))
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), StoreError> {
        if let Some(user) = self.lock().get_mut(&id) {
            user.is_active = is_active;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Role;
    use anyhow::Result;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            picture: None,
            password_hash: Some("$argon2id$stub".to_string()),
            role: Role::User,
            is_active: true,
            external_id: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() -> Result<()> {
        let store = MemoryUserStore::new();
        store.insert_user(new_user("a@example.com")).await?;
        let err = store.insert_user(new_user("a@example.com")).await;
        assert!(matches!(err, Err(StoreError::DuplicateEmail)));
        Ok(())
    }

    #[tokio::test]
    async fn consume_reset_token_is_single_use() -> Result<()> {
        let store = MemoryUserStore::new();
        let user = store.insert_user(new_user("reset@example.com")).await?;
        let hash = vec![7_u8; 32];
        store
            .set_reset_token(user.id, &hash, Utc::now() + Duration::hours(1))
            .await?;

        let first = store
            .consume_reset_token(&hash, Utc::now(), "$argon2id$new")
            .await?;
        let second = store
            .consume_reset_token(&hash, Utc::now(), "$argon2id$other")
            .await?;
        assert!(first);
        assert!(!second);

        let stored = store
            .find_by_id(user.id)
            .await?
            .expect("user should still exist");
        assert_eq!(stored.password_hash.as_deref(), Some("$argon2id$new"));
        assert!(stored.reset_token_hash.is_none());
        assert!(stored.reset_token_expires_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn consume_reset_token_rejects_expired() -> Result<()> {
        let store = MemoryUserStore::new();
        let user = store.insert_user(new_user("stale@example.com")).await?;
        let hash = vec![9_u8; 32];
        store
            .set_reset_token(user.id, &hash, Utc::now() - Duration::minutes(1))
            .await?;

        let consumed = store
            .consume_reset_token(&hash, Utc::now(), "$argon2id$new")
            .await?;
        assert!(!consumed);
        Ok(())
    }

    #[tokio::test]
    async fn link_external_id_keeps_existing_picture() -> Result<()> {
        let store = MemoryUserStore::new();
        let mut user = new_user("pic@example.com");
        user.picture = Some("https://cdn.example.com/me.png".to_string());
        let user = store.insert_user(user).await?;

        let linked = store
            .link_external_id(user.id, "google-123", Some("https://other/pic.png"))
            .await?
            .expect("user exists");
        assert_eq!(linked.external_id.as_deref(), Some("google-123"));
        assert_eq!(
            linked.picture.as_deref(),
            Some("https://cdn.example.com/me.png")
        );
        Ok(())
    }
}
