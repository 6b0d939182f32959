//! User group membership repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tillpoint_core::error::{AppError, ErrorKind};
use tillpoint_core::result::AppResult;
use tillpoint_entity::group::UserGroupMembership;

/// Repository for user-to-group memberships.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Create a new membership repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a membership keyed by (user, group). Re-adding a previously
    /// removed member re-activates the existing row.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        assigned_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserGroupMembership> {
        sqlx::query_as::<_, UserGroupMembership>(
            "INSERT INTO user_group_memberships (user_id, group_id, assigned_by, expires_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, group_id) DO UPDATE SET \
                 assigned_by = EXCLUDED.assigned_by, \
                 expires_at = EXCLUDED.expires_at, \
                 is_active = TRUE, \
                 assigned_at = NOW() \
             RETURNING *",
        )
        .bind(user_id)
        .bind(group_id)
        .bind(assigned_by)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert membership", e))
    }

    /// Soft-deactivate a membership. Returns `true` if an active row was
    /// deactivated.
    pub async fn deactivate(&self, user_id: Uuid, group_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_group_memberships SET is_active = FALSE \
             WHERE user_id = $1 AND group_id = $2 AND is_active = TRUE",
        )
        .bind(user_id)
        .bind(group_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to deactivate membership", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's currently effective memberships.
    pub async fn find_effective_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<UserGroupMembership>> {
        sqlx::query_as::<_, UserGroupMembership>(
            "SELECT * FROM user_group_memberships \
             WHERE user_id = $1 AND is_active = TRUE \
             AND (expires_at IS NULL OR expires_at > NOW()) \
             ORDER BY assigned_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list memberships", e)
        })
    }
}
