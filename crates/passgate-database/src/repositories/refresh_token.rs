//! Refresh token repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use passgate_core::error::{AppError, ErrorKind};
use passgate_core::result::AppResult;
use passgate_entity::session::{NewRefreshToken, RefreshToken};

use crate::store::{RefreshTokenStore, RotationOutcome};

use super::map_write_err;

const INSERT_TOKEN: &str = "INSERT INTO refresh_tokens (id, token, session_id, expires_at, revoked, \
     created_at, updated_at) VALUES ($1, $2, $3, $4, FALSE, $5, $5) RETURNING *";

/// PostgreSQL-backed refresh token store.
#[derive(Debug, Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenRepository {
    async fn insert(&self, new: &NewRefreshToken) -> AppResult<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>(INSERT_TOKEN)
            .bind(Uuid::now_v7())
            .bind(&new.token)
            .bind(new.session_id)
            .bind(new.expires_at)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, "Failed to create refresh token"))
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find refresh token", e)
            })
    }

    async fn find_active_by_session(&self, session_row: Uuid) -> AppResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE session_id = $1 AND revoked = FALSE \
             AND expires_at > NOW() ORDER BY created_at DESC LIMIT 1",
        )
        .bind(session_row)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find session token", e)
        })
    }

    async fn revoke(&self, token: &str, reason: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, revoked_reason = $2, updated_at = NOW() \
             WHERE token = $1 AND revoked = FALSE",
        )
        .bind(token)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to revoke refresh token", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn rotate(
        &self,
        consumed: &str,
        successor: &NewRefreshToken,
        reason: &str,
    ) -> AppResult<RotationOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // A concurrent rotation blocks on the row lock and then re-evaluates
        // the predicate, so only one caller ever sees a matching row.
        let won = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, revoked_reason = $2, \
             replaced_by_token = $3, updated_at = NOW() \
             WHERE token = $1 AND revoked = FALSE AND expires_at > NOW()",
        )
        .bind(consumed)
        .bind(reason)
        .bind(&successor.token)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to consume refresh token", e)
        })?
        .rows_affected()
            == 1;

        if !won {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to roll back rotation", e)
            })?;
            return Ok(RotationOutcome::Lost);
        }

        let inserted = sqlx::query_as::<_, RefreshToken>(INSERT_TOKEN)
            .bind(Uuid::now_v7())
            .bind(&successor.token)
            .bind(successor.session_id)
            .bind(successor.expires_at)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_err(e, "Failed to insert successor token"))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit rotation", e)
        })?;

        Ok(RotationOutcome::Rotated(inserted))
    }
}
