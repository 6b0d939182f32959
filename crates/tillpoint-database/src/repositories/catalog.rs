//! Permission catalog repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use tillpoint_core::error::{AppError, ErrorKind};
use tillpoint_core::result::AppResult;
use tillpoint_entity::catalog::{ModuleActionEdge, ModuleActionMeta, PosAction, PosModule};

/// Repository for the module/action catalog and its provisioning upserts.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Create a new catalog repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all modules, ordered for display.
    pub async fn list_modules(&self) -> AppResult<Vec<PosModule>> {
        sqlx::query_as::<_, PosModule>("SELECT * FROM pos_modules ORDER BY sort_order ASC, key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list modules", e))
    }

    /// List all actions.
    pub async fn list_actions(&self) -> AppResult<Vec<PosAction>> {
        sqlx::query_as::<_, PosAction>("SELECT * FROM pos_actions ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list actions", e))
    }

    /// List the actions applicable to a module.
    pub async fn list_module_actions(&self, module_key: &str) -> AppResult<Vec<PosAction>> {
        sqlx::query_as::<_, PosAction>(
            "SELECT a.* FROM pos_actions a \
             INNER JOIN module_actions ma ON ma.action_id = a.id \
             INNER JOIN pos_modules m ON m.id = ma.module_id \
             WHERE m.key = $1 ORDER BY a.key ASC",
        )
        .bind(module_key)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list module actions", e))
    }

    /// List all module-action edges.
    pub async fn list_edges(&self) -> AppResult<Vec<ModuleActionEdge>> {
        sqlx::query_as::<_, ModuleActionEdge>(
            "SELECT id, module_id, action_id, is_default FROM module_actions",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list catalog edges", e))
    }

    /// Find a module by its key.
    pub async fn find_module_by_key(&self, key: &str) -> AppResult<Option<PosModule>> {
        sqlx::query_as::<_, PosModule>("SELECT * FROM pos_modules WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find module", e))
    }

    /// Find an action by its key.
    pub async fn find_action_by_key(&self, key: &str) -> AppResult<Option<PosAction>> {
        sqlx::query_as::<_, PosAction>("SELECT * FROM pos_actions WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find action", e))
    }

    /// Look up one (module, action) capability by keys.
    pub async fn find_module_action(
        &self,
        module_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ModuleActionMeta>> {
        sqlx::query_as::<_, ModuleActionMeta>(
            "SELECT ma.module_id, ma.action_id, m.key AS module_key, a.key AS action_key, \
                    a.is_sensitive, a.requires_approval, ma.is_default \
             FROM module_actions ma \
             INNER JOIN pos_modules m ON m.id = ma.module_id \
             INNER JOIN pos_actions a ON a.id = ma.action_id \
             WHERE m.key = $1 AND a.key = $2",
        )
        .bind(module_key)
        .bind(action_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to look up capability", e))
    }

    /// Provision a module. Insert-if-absent, update-if-changed on the
    /// seed-owned fields only; a manually edited `is_active` flag is never
    /// clobbered.
    pub async fn upsert_module(
        &self,
        key: &str,
        display_name: &str,
        description: Option<&str>,
        icon: Option<&str>,
        sort_order: i32,
    ) -> AppResult<PosModule> {
        sqlx::query_as::<_, PosModule>(
            "INSERT INTO pos_modules (key, display_name, description, icon, sort_order) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (key) DO UPDATE SET \
                 display_name = EXCLUDED.display_name, \
                 description = EXCLUDED.description, \
                 icon = EXCLUDED.icon, \
                 sort_order = EXCLUDED.sort_order \
             RETURNING *",
        )
        .bind(key)
        .bind(display_name)
        .bind(description)
        .bind(icon)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert module", e))
    }

    /// Provision an action. Sensitivity flags are seed-owned and updated.
    pub async fn upsert_action(
        &self,
        key: &str,
        display_name: &str,
        description: Option<&str>,
        is_sensitive: bool,
        requires_approval: bool,
    ) -> AppResult<PosAction> {
        sqlx::query_as::<_, PosAction>(
            "INSERT INTO pos_actions (key, display_name, description, is_sensitive, requires_approval) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (key) DO UPDATE SET \
                 display_name = EXCLUDED.display_name, \
                 description = EXCLUDED.description, \
                 is_sensitive = EXCLUDED.is_sensitive, \
                 requires_approval = EXCLUDED.requires_approval \
             RETURNING *",
        )
        .bind(key)
        .bind(display_name)
        .bind(description)
        .bind(is_sensitive)
        .bind(requires_approval)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert action", e))
    }

    /// Provision a module-action edge. The unique constraint on
    /// (module, action) makes re-runs idempotent.
    pub async fn upsert_module_action(
        &self,
        module_id: Uuid,
        action_id: Uuid,
        is_default: bool,
    ) -> AppResult<ModuleActionEdge> {
        sqlx::query_as::<_, ModuleActionEdge>(
            "INSERT INTO module_actions (module_id, action_id, is_default) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (module_id, action_id) DO UPDATE SET is_default = EXCLUDED.is_default \
             RETURNING id, module_id, action_id, is_default",
        )
        .bind(module_id)
        .bind(action_id)
        .bind(is_default)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert module action", e)
        })
    }
}
