//! Session repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use passgate_core::error::{AppError, ErrorKind};
use passgate_core::result::AppResult;
use passgate_entity::session::{NewSession, Session, SessionActivity};

use crate::store::SessionStore;

use super::map_write_err;

/// PostgreSQL-backed session store.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn insert(&self, new: &NewSession) -> AppResult<Session> {
        let now = Utc::now();
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, session_id, user_id, ip_address, device_info, location, \
             last_active, expires_at, revoked, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $7, $7) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(&new.session_id)
        .bind(new.user_id)
        .bind(&new.ip_address)
        .bind(&new.device_info)
        .bind(&new.location)
        .bind(now)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_err(e, "Failed to create session"))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn find_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn find_active_by_session_id(&self, session_id: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE session_id = $1 AND revoked = FALSE AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find active session", e)
        })
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 AND revoked = FALSE AND expires_at > NOW() \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find active sessions", e)
        })
    }

    async fn record_refresh(&self, id: Uuid, activity: &SessionActivity) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET last_active = NOW(), ip_address = $2, device_info = $3, \
             expires_at = $4, updated_at = NOW() WHERE id = $1 AND revoked = FALSE",
        )
        .bind(id)
        .bind(&activity.ip_address)
        .bind(&activity.device_info)
        .bind(activity.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record session refresh", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch(&self, session_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET last_active = NOW(), updated_at = NOW() \
             WHERE session_id = $1 AND revoked = FALSE AND expires_at > NOW()",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch session", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke(&self, session_id: &str, reason: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let revoked = sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_reason = $2, updated_at = NOW() \
             WHERE session_id = $1 AND revoked = FALSE",
        )
        .bind(session_id)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke session", e))?
        .rows_affected()
            > 0;

        sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, revoked_reason = $2, updated_at = NOW() \
             WHERE revoked = FALSE AND session_id = (SELECT id FROM sessions WHERE session_id = $1)",
        )
        .bind(session_id)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to revoke session tokens", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit session revoke", e)
        })?;

        Ok(revoked)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid, reason: &str) -> AppResult<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "UPDATE sessions SET revoked = TRUE, revoked_reason = $2, updated_at = NOW() \
             WHERE user_id = $1 AND revoked = FALSE RETURNING id, session_id",
        )
        .bind(user_id)
        .bind(reason)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to revoke user sessions", e)
        })?;

        let (row_ids, session_ids): (Vec<Uuid>, Vec<String>) = rows.into_iter().unzip();

        if !row_ids.is_empty() {
            sqlx::query(
                "UPDATE refresh_tokens SET revoked = TRUE, revoked_reason = $2, updated_at = NOW() \
                 WHERE revoked = FALSE AND session_id = ANY($1)",
            )
            .bind(&row_ids)
            .bind(reason)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to revoke user tokens", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit user revoke", e)
        })?;

        Ok(session_ids)
    }
}
