//! PostgreSQL implementations of the option store and the user directory.
//!
//! Tables are created by the migrations in `migrations/`; see [`crate::MIGRATOR`].

use std::time::Duration;

use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::options::OptionStore;
use crate::db::users::UserDirectory;
use crate::types::{CurrentUser, Role, UserId};

/// Option store backed by the `options` table.
#[derive(Clone)]
pub struct PostgresOptionStore {
    pool: PgPool,
}

impl PostgresOptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OptionStore for PostgresOptionStore {
    #[instrument(skip(self), err)]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM options WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(value_len = value.len()), err)]
    async fn put(&self, key: &str, value: &str, timeout: Duration) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Server-side deadline: a cancelled statement aborts the transaction, so nothing is written
        sqlx::query(&format!("SET LOCAL statement_timeout = {}", timeout.as_millis().max(1)))
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO options (key, value, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::Timeout { .. } => DbError::Timeout {
                operation: format!("write option {key}"),
                after: Some(timeout),
            },
            other => other,
        })?;

        tx.commit().await?;
        Ok(())
    }
}

/// User directory backed by the `users` table.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[instrument(skip(self), err)]
    async fn get_user_by_id(&self, id: UserId) -> Result<Option<CurrentUser>> {
        let row = sqlx::query(r#"SELECT id, username, "group", role FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row.try_get("role")?;
        let role = role
            .parse::<Role>()
            .map_err(|e| DbError::Other(anyhow::anyhow!("user {id} has invalid role: {e}")))?;

        Ok(Some(CurrentUser {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            group: row.try_get("group")?,
            role,
        }))
    }
}
