//! Storage and audit ports for the engine, plus the Postgres adapter.
//!
//! The engine and mutation API consume these narrow traits so that tests
//! can run against in-memory doubles; production wires them to the
//! repository layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tillpoint_core::result::AppResult;
use tillpoint_database::repositories::{
    AuditLogRepository, CatalogRepository, GroupRepository, IndividualPermissionRepository,
    MembershipRepository,
};
use tillpoint_entity::audit::CreateAuditLogEntry;
use tillpoint_entity::catalog::ModuleActionMeta;
use tillpoint_entity::group::{GroupPermission, PermissionGroup, UserGroupMembership};
use tillpoint_entity::permission::{
    GroupGrant, IndividualGrant, IndividualPermission, PermissionConditions, PermissionType,
};

use crate::catalog::CatalogData;

/// Parameters for upserting an individual override.
#[derive(Debug, Clone)]
pub struct IndividualUpsert {
    /// The user being overridden.
    pub user_id: Uuid,
    /// The module identifier.
    pub module_id: Uuid,
    /// The action identifier.
    pub action_id: Uuid,
    /// Allow or deny.
    pub permission_type: PermissionType,
    /// Whether the capability is granted.
    pub is_granted: bool,
    /// Optional runtime constraints.
    pub conditions: Option<PermissionConditions>,
    /// When the override expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// Admin recording the override.
    pub granted_by: Uuid,
    /// Free-text justification.
    pub reason: Option<String>,
}

/// Storage port for permission resolution and administration.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Load the full catalog (modules, actions, edges).
    async fn load_catalog(&self) -> AppResult<CatalogData>;

    /// Look up one capability by keys.
    async fn find_capability(
        &self,
        module_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ModuleActionMeta>>;

    /// Load a user's non-expired individual overrides.
    async fn individual_grants(&self, user_id: Uuid) -> AppResult<Vec<IndividualGrant>>;

    /// Load the group grants reaching a user through effective memberships.
    async fn group_grants(&self, user_id: Uuid) -> AppResult<Vec<GroupGrant>>;

    /// Upsert an individual override keyed by (user, module, action).
    async fn upsert_individual(&self, upsert: &IndividualUpsert)
        -> AppResult<IndividualPermission>;

    /// Hard-delete an individual override. Returns whether a row existed.
    async fn delete_individual(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool>;

    /// Purge overrides that expired before the given instant.
    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;

    /// Create a permission group.
    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> AppResult<PermissionGroup>;

    /// Find a group by ID.
    async fn find_group(&self, group_id: Uuid) -> AppResult<Option<PermissionGroup>>;

    /// Upsert a group grant keyed by (group, module, action).
    async fn set_group_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
        is_granted: bool,
        conditions: Option<&PermissionConditions>,
        granted_by: Uuid,
    ) -> AppResult<GroupPermission>;

    /// Remove a group grant. Returns whether a row existed.
    async fn remove_group_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool>;

    /// Upsert a membership keyed by (user, group).
    async fn upsert_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        assigned_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserGroupMembership>;

    /// Soft-deactivate a membership. Returns whether an active row existed.
    async fn deactivate_membership(&self, user_id: Uuid, group_id: Uuid) -> AppResult<bool>;
}

/// Audit port: append-only, consumed by the recorder.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one audit entry.
    async fn append(&self, entry: CreateAuditLogEntry) -> AppResult<()>;
}

#[async_trait]
impl AuditSink for AuditLogRepository {
    async fn append(&self, entry: CreateAuditLogEntry) -> AppResult<()> {
        self.create(&entry).await.map(|_| ())
    }
}

/// Postgres-backed [`PolicyStore`] composed from the repository layer.
#[derive(Debug, Clone)]
pub struct PgPolicyStore {
    catalog: CatalogRepository,
    individual: IndividualPermissionRepository,
    groups: GroupRepository,
    memberships: MembershipRepository,
}

impl PgPolicyStore {
    /// Create a store over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            catalog: CatalogRepository::new(pool.clone()),
            individual: IndividualPermissionRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            memberships: MembershipRepository::new(pool),
        }
    }

    /// The underlying membership repository (administrative listings).
    pub fn memberships(&self) -> &MembershipRepository {
        &self.memberships
    }

    /// The underlying catalog repository.
    pub fn catalog(&self) -> &CatalogRepository {
        &self.catalog
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn load_catalog(&self) -> AppResult<CatalogData> {
        let modules = self.catalog.list_modules().await?;
        let actions = self.catalog.list_actions().await?;
        let edges = self.catalog.list_edges().await?;
        Ok(CatalogData {
            modules,
            actions,
            edges,
        })
    }

    async fn find_capability(
        &self,
        module_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ModuleActionMeta>> {
        self.catalog.find_module_action(module_key, action_key).await
    }

    async fn individual_grants(&self, user_id: Uuid) -> AppResult<Vec<IndividualGrant>> {
        self.individual.effective_grants_for_user(user_id).await
    }

    async fn group_grants(&self, user_id: Uuid) -> AppResult<Vec<GroupGrant>> {
        self.groups.effective_grants_for_user(user_id).await
    }

    async fn upsert_individual(
        &self,
        upsert: &IndividualUpsert,
    ) -> AppResult<IndividualPermission> {
        self.individual
            .upsert(
                upsert.user_id,
                upsert.module_id,
                upsert.action_id,
                upsert.permission_type,
                upsert.is_granted,
                upsert.conditions.as_ref(),
                upsert.expires_at,
                upsert.granted_by,
                upsert.reason.as_deref(),
            )
            .await
    }

    async fn delete_individual(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool> {
        self.individual.delete(user_id, module_id, action_id).await
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        self.individual.purge_expired(before).await
    }

    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> AppResult<PermissionGroup> {
        self.groups.create(name, description, color).await
    }

    async fn find_group(&self, group_id: Uuid) -> AppResult<Option<PermissionGroup>> {
        self.groups.find_by_id(group_id).await
    }

    async fn set_group_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
        is_granted: bool,
        conditions: Option<&PermissionConditions>,
        granted_by: Uuid,
    ) -> AppResult<GroupPermission> {
        self.groups
            .set_permission(group_id, module_id, action_id, is_granted, conditions, granted_by)
            .await
    }

    async fn remove_group_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool> {
        self.groups
            .remove_permission(group_id, module_id, action_id)
            .await
    }

    async fn upsert_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        assigned_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserGroupMembership> {
        self.memberships
            .upsert(user_id, group_id, assigned_by, expires_at)
            .await
    }

    async fn deactivate_membership(&self, user_id: Uuid, group_id: Uuid) -> AppResult<bool> {
        self.memberships.deactivate(user_id, group_id).await
    }
}
