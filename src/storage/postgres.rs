//! Postgres-backed [`UserStore`].
//!
//! Queries are instrumented with `db.query` spans. The reset-token
//! consumption relies on a conditional `UPDATE` so the database decides the
//! race: only one of two concurrent consumers observes the still-valid token.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{NewUser, ProfileUpdate, Role, StoreError, UserRecord, UserStore};

const USER_COLUMNS: &str = "id, email, first_name, last_name, picture, password_hash, \
     role, is_active, external_id, reset_token_hash, reset_token_expires_at, created_at";

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    let role: String = row.get("role");
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::Backend(anyhow!("unknown role in users table: {role}")))?;
    Ok(UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        picture: row.get("picture"),
        password_hash: row.get("password_hash"),
        role,
        is_active: row.get("is_active"),
        external_id: row.get("external_id"),
        reset_token_hash: row.get("reset_token_hash"),
        reset_token_expires_at: row.get("reset_token_expires_at"),
        created_at: row.get("created_at"),
    })
}

fn backend(err: sqlx::Error, what: &'static str) -> StoreError {
    StoreError::Backend(anyhow::Error::new(err).context(what))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let query = format!(
            "INSERT INTO users \
                (email, first_name, last_name, picture, password_hash, role, is_active, external_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let row = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.picture)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(&user.external_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::DuplicateEmail
                } else {
                    backend(err, "failed to insert user")
                }
            })?;
        map_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup user by email"))?;
        row.as_ref().map(map_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to lookup user by id"))?;
        row.as_ref().map(map_row).transpose()
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = format!(
            "UPDATE users SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                picture = COALESCE($4, picture) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.picture)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to update profile"))?;
        row.as_ref().map(map_row).transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to update password"))?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query =
            "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        sqlx::query(query)
            .bind(id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to store reset token"))?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<bool, StoreError> {
        // The WHERE clause repeats the lookup predicate, so of two racing
        // consumers only one update can match.
        let query = "UPDATE users SET \
                password_hash = $3, \
                reset_token_hash = NULL, \
                reset_token_expires_at = NULL \
             WHERE reset_token_hash = $1 AND reset_token_expires_at > $2";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .bind(new_password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to consume reset token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn link_external_id(
        &self,
        id: Uuid,
        external_id: &str,
        picture: Option<&str>,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = format!(
            "UPDATE users SET \
                external_id = $2, \
                picture = COALESCE(picture, $3) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(external_id)
            .bind(picture)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to link external id"))?;
        row.as_ref().map(map_row).transpose()
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<(), StoreError> {
        let query = "UPDATE users SET is_active = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        sqlx::query(query)
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| backend(err, "failed to update active flag"))?;
        Ok(())
    }

    /// Ping the database, used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError> {
        use sqlx::Connection;
        let span = tracing::info_span!(
            "db.ping",
            db.system = "postgresql",
            db.operation = "PING"
        );
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")
            .map_err(StoreError::Backend)?;
        conn.ping()
            .instrument(span)
            .await
            .context("failed to ping database")
            .map_err(StoreError::Backend)
    }
}
