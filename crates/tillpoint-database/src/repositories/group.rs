//! Permission group repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use tillpoint_core::error::{AppError, ErrorKind};
use tillpoint_core::result::AppResult;
use tillpoint_entity::group::{GroupPermission, PermissionGroup};
use tillpoint_entity::permission::{GroupGrant, PermissionConditions};

/// Repository for permission groups and their grants.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new permission group.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> AppResult<PermissionGroup> {
        sqlx::query_as::<_, PermissionGroup>(
            "INSERT INTO permission_groups (name, description, color) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::conflict(format!(
                        "Permission group '{name}' already exists"
                    ));
                }
            }
            AppError::with_source(ErrorKind::Database, "Failed to create group", e)
        })
    }

    /// Find a group by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PermissionGroup>> {
        sqlx::query_as::<_, PermissionGroup>("SELECT * FROM permission_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find group", e))
    }

    /// Find a group by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<PermissionGroup>> {
        sqlx::query_as::<_, PermissionGroup>("SELECT * FROM permission_groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find group", e))
    }

    /// List all active groups.
    pub async fn list_active(&self) -> AppResult<Vec<PermissionGroup>> {
        sqlx::query_as::<_, PermissionGroup>(
            "SELECT * FROM permission_groups WHERE is_active = TRUE ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list groups", e))
    }

    /// List the grant rows of a group.
    pub async fn list_permissions(&self, group_id: Uuid) -> AppResult<Vec<GroupPermission>> {
        sqlx::query_as::<_, GroupPermission>(
            "SELECT * FROM group_permissions WHERE group_id = $1 ORDER BY created_at ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list group permissions", e)
        })
    }

    /// Upsert a grant of (module, action) to a group, keyed by the unique
    /// (group, module, action) constraint.
    pub async fn set_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
        is_granted: bool,
        conditions: Option<&PermissionConditions>,
        granted_by: Uuid,
    ) -> AppResult<GroupPermission> {
        let conditions = conditions.map(serde_json::to_value).transpose()?;

        sqlx::query_as::<_, GroupPermission>(
            "INSERT INTO group_permissions \
                 (group_id, module_id, action_id, is_granted, conditions, granted_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (group_id, module_id, action_id) DO UPDATE SET \
                 is_granted = EXCLUDED.is_granted, \
                 conditions = EXCLUDED.conditions, \
                 granted_by = EXCLUDED.granted_by \
             RETURNING *",
        )
        .bind(group_id)
        .bind(module_id)
        .bind(action_id)
        .bind(is_granted)
        .bind(conditions)
        .bind(granted_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to set group permission", e)
        })
    }

    /// Remove a grant from a group. Returns `true` if a row was removed.
    pub async fn remove_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM group_permissions \
             WHERE group_id = $1 AND module_id = $2 AND action_id = $3",
        )
        .bind(group_id)
        .bind(module_id)
        .bind(action_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to remove group permission", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    /// Load the group grants reaching a user through active groups and
    /// active, non-expired memberships, joined against the catalog.
    pub async fn effective_grants_for_user(&self, user_id: Uuid) -> AppResult<Vec<GroupGrant>> {
        sqlx::query_as::<_, GroupGrant>(
            "SELECT g.id AS group_id, g.name AS group_name, m.key AS module_key, \
                    a.key AS action_key, gp.is_granted, gp.conditions \
             FROM group_permissions gp \
             INNER JOIN permission_groups g ON g.id = gp.group_id AND g.is_active = TRUE \
             INNER JOIN user_group_memberships ugm ON ugm.group_id = gp.group_id \
             INNER JOIN pos_modules m ON m.id = gp.module_id \
             INNER JOIN pos_actions a ON a.id = gp.action_id \
             WHERE ugm.user_id = $1 AND ugm.is_active = TRUE \
             AND (ugm.expires_at IS NULL OR ugm.expires_at > NOW())",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load group grants", e))
    }
}
