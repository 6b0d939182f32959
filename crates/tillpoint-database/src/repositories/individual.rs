//! Individual permission override repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tillpoint_core::error::{AppError, ErrorKind};
use tillpoint_core::result::AppResult;
use tillpoint_entity::permission::{
    IndividualGrant, IndividualPermission, PermissionConditions, PermissionType,
};

/// Repository for per-user permission overrides.
#[derive(Debug, Clone)]
pub struct IndividualPermissionRepository {
    pool: PgPool,
}

impl IndividualPermissionRepository {
    /// Create a new individual permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the non-expired overrides for a user, joined against the
    /// catalog so the engine can key them by `"module:action"`.
    pub async fn effective_grants_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<IndividualGrant>> {
        sqlx::query_as::<_, IndividualGrant>(
            "SELECT m.key AS module_key, a.key AS action_key, ip.permission_type, \
                    ip.is_granted, ip.conditions, ip.expires_at \
             FROM individual_permissions ip \
             INNER JOIN pos_modules m ON m.id = ip.module_id \
             INNER JOIN pos_actions a ON a.id = ip.action_id \
             WHERE ip.user_id = $1 \
             AND (ip.expires_at IS NULL OR ip.expires_at > NOW())",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load individual grants", e)
        })
    }

    /// Find the override row for one (user, module, action), expired or not.
    pub async fn find(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<Option<IndividualPermission>> {
        sqlx::query_as::<_, IndividualPermission>(
            "SELECT * FROM individual_permissions \
             WHERE user_id = $1 AND module_id = $2 AND action_id = $3",
        )
        .bind(user_id)
        .bind(module_id)
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find individual permission", e)
        })
    }

    /// Upsert an override keyed by (user, module, action). The unique
    /// constraint plus ON CONFLICT keeps concurrent administrators from
    /// creating duplicate rows.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
        permission_type: PermissionType,
        is_granted: bool,
        conditions: Option<&PermissionConditions>,
        expires_at: Option<DateTime<Utc>>,
        granted_by: Uuid,
        reason: Option<&str>,
    ) -> AppResult<IndividualPermission> {
        let conditions = conditions.map(serde_json::to_value).transpose()?;

        sqlx::query_as::<_, IndividualPermission>(
            "INSERT INTO individual_permissions \
                 (user_id, module_id, action_id, permission_type, is_granted, \
                  conditions, expires_at, granted_by, reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id, module_id, action_id) DO UPDATE SET \
                 permission_type = EXCLUDED.permission_type, \
                 is_granted = EXCLUDED.is_granted, \
                 conditions = EXCLUDED.conditions, \
                 expires_at = EXCLUDED.expires_at, \
                 granted_by = EXCLUDED.granted_by, \
                 reason = EXCLUDED.reason, \
                 updated_at = NOW() \
             RETURNING *",
        )
        .bind(user_id)
        .bind(module_id)
        .bind(action_id)
        .bind(permission_type)
        .bind(is_granted)
        .bind(conditions)
        .bind(expires_at)
        .bind(granted_by)
        .bind(reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert individual permission", e)
        })
    }

    /// Hard-delete the override for one (user, module, action).
    ///
    /// Returns `true` if a row was removed. Deleting an override does not
    /// restore anything; group resolution simply applies again.
    pub async fn delete(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM individual_permissions \
             WHERE user_id = $1 AND module_id = $2 AND action_id = $3",
        )
        .bind(user_id)
        .bind(module_id)
        .bind(action_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete individual permission", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    /// Purge overrides that expired before the given instant. Expired rows
    /// are inert during resolution; this is the explicit cleanup.
    pub async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM individual_permissions WHERE expires_at IS NOT NULL AND expires_at < $1")
                .bind(before)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to purge expired permissions",
                        e,
                    )
                })?;
        Ok(result.rows_affected())
    }
}
