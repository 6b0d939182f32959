//! Administrative mutation API.
//!
//! Grants, denies, revokes, group and membership changes. Every mutation
//! validates its catalog keys, writes through the store, invalidates the
//! affected snapshots, and records a flushed audit entry.
//!
//! The caller is responsible for having passed its own "manage
//! permissions" check before invoking any of these; the mutation API does
//! not self-authorize.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tillpoint_core::error::AppError;
use tillpoint_core::result::AppResult;
use tillpoint_core::types::keys::{ActionKey, ModuleKey};
use tillpoint_entity::audit::{AuditActionType, CreateAuditLogEntry, RiskLevel};
use tillpoint_entity::catalog::ModuleActionMeta;
use tillpoint_entity::group::{GroupPermission, PermissionGroup, UserGroupMembership};
use tillpoint_entity::permission::{IndividualPermission, PermissionConditions, PermissionType};

use crate::audit::{self, AuditRecorder};
use crate::snapshot::SnapshotCache;
use crate::store::{IndividualUpsert, PolicyStore};

/// Optional parameters for an individual grant or deny.
#[derive(Debug, Clone, Default)]
pub struct GrantOptions {
    /// Runtime constraints attached to the override.
    pub conditions: Option<PermissionConditions>,
    /// When the override lapses.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text justification. Required for sensitive capabilities.
    pub reason: Option<String>,
}

/// The administrative mutation service.
#[derive(Clone)]
pub struct PermissionAdmin {
    store: Arc<dyn PolicyStore>,
    audit: AuditRecorder,
    snapshots: SnapshotCache,
}

impl std::fmt::Debug for PermissionAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionAdmin").finish()
    }
}

impl PermissionAdmin {
    /// Create the mutation service.
    ///
    /// `snapshots` is the engine's cache handle; mutations invalidate it
    /// instead of reaching into any global state.
    pub fn new(
        store: Arc<dyn PolicyStore>,
        audit: AuditRecorder,
        snapshots: SnapshotCache,
    ) -> Self {
        Self {
            store,
            audit,
            snapshots,
        }
    }

    /// Resolve a (module, action) pair against the catalog, failing loudly
    /// when the keys are unknown: that is a setup defect, not a denial.
    async fn require_capability(
        &self,
        module: &ModuleKey,
        action: &ActionKey,
    ) -> AppResult<ModuleActionMeta> {
        self.store
            .find_capability(module.as_str(), action.as_str())
            .await?
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "Capability '{module}:{action}' is not in the permission catalog"
                ))
            })
    }

    /// Grant a capability to a user as an individual allow override.
    ///
    /// Upserts on (user, module, action): repeated grants result in one
    /// row. Sensitive capabilities require a reason.
    pub async fn grant_permission(
        &self,
        target_user: Uuid,
        module: &ModuleKey,
        action: &ActionKey,
        granted_by: Uuid,
        options: GrantOptions,
    ) -> AppResult<IndividualPermission> {
        let meta = self.require_capability(module, action).await?;
        require_reason_if_sensitive(&meta, options.reason.as_deref(), module, action)?;

        let row = self
            .store
            .upsert_individual(&IndividualUpsert {
                user_id: target_user,
                module_id: meta.module_id,
                action_id: meta.action_id,
                permission_type: PermissionType::Allow,
                is_granted: true,
                conditions: options.conditions.clone(),
                expires_at: options.expires_at,
                granted_by,
                reason: options.reason.clone(),
            })
            .await?;

        self.snapshots.invalidate_user(target_user);
        self.audit
            .record_flushed(mutation_entry(
                granted_by,
                AuditActionType::PermissionGranted,
                Some(&meta),
                audit::mutation_risk(meta.is_sensitive),
                json!({
                    "change": "grant",
                    "target_user": target_user,
                    "module": module.as_str(),
                    "action": action.as_str(),
                    "expires_at": options.expires_at,
                    "reason": options.reason,
                }),
            ))
            .await;

        info!(
            target_user = %target_user,
            granted_by = %granted_by,
            capability = %format!("{module}:{action}"),
            "Individual permission granted"
        );
        Ok(row)
    }

    /// Record an explicit individual deny for a user.
    ///
    /// A deny override rejects the capability during resolution no matter
    /// what any group grants.
    pub async fn deny_permission(
        &self,
        target_user: Uuid,
        module: &ModuleKey,
        action: &ActionKey,
        denied_by: Uuid,
        options: GrantOptions,
    ) -> AppResult<IndividualPermission> {
        let meta = self.require_capability(module, action).await?;

        let row = self
            .store
            .upsert_individual(&IndividualUpsert {
                user_id: target_user,
                module_id: meta.module_id,
                action_id: meta.action_id,
                permission_type: PermissionType::Deny,
                is_granted: false,
                conditions: options.conditions.clone(),
                expires_at: options.expires_at,
                granted_by: denied_by,
                reason: options.reason.clone(),
            })
            .await?;

        self.snapshots.invalidate_user(target_user);
        self.audit
            .record_flushed(mutation_entry(
                denied_by,
                AuditActionType::PermissionChanged,
                Some(&meta),
                audit::mutation_risk(meta.is_sensitive),
                json!({
                    "change": "deny",
                    "target_user": target_user,
                    "module": module.as_str(),
                    "action": action.as_str(),
                    "reason": options.reason,
                }),
            ))
            .await;

        info!(
            target_user = %target_user,
            denied_by = %denied_by,
            capability = %format!("{module}:{action}"),
            "Individual permission denied"
        );
        Ok(row)
    }

    /// Remove a user's individual override.
    ///
    /// Hard delete. This does not restore any earlier state; group
    /// resolution simply applies again. Returns whether a row existed.
    pub async fn revoke_permission(
        &self,
        target_user: Uuid,
        module: &ModuleKey,
        action: &ActionKey,
        revoked_by: Uuid,
        reason: Option<String>,
    ) -> AppResult<bool> {
        let meta = self.require_capability(module, action).await?;

        let removed = self
            .store
            .delete_individual(target_user, meta.module_id, meta.action_id)
            .await?;

        self.snapshots.invalidate_user(target_user);
        self.audit
            .record_flushed(mutation_entry(
                revoked_by,
                AuditActionType::PermissionChanged,
                Some(&meta),
                audit::mutation_risk(meta.is_sensitive),
                json!({
                    "change": "revoke",
                    "target_user": target_user,
                    "module": module.as_str(),
                    "action": action.as_str(),
                    "removed": removed,
                    "reason": reason,
                }),
            ))
            .await;

        info!(
            target_user = %target_user,
            revoked_by = %revoked_by,
            capability = %format!("{module}:{action}"),
            removed,
            "Individual permission revoked"
        );
        Ok(removed)
    }

    /// Add a user to a group (or re-activate a removed membership).
    pub async fn add_user_to_group(
        &self,
        target_user: Uuid,
        group_id: Uuid,
        assigned_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserGroupMembership> {
        let group = self.require_group(group_id).await?;

        let membership = self
            .store
            .upsert_membership(target_user, group_id, assigned_by, expires_at)
            .await?;

        self.snapshots.invalidate_user(target_user);
        self.audit
            .record_flushed(mutation_entry(
                assigned_by,
                AuditActionType::PermissionChanged,
                None,
                RiskLevel::Medium,
                json!({
                    "change": "group_add",
                    "target_user": target_user,
                    "group_id": group_id,
                    "group_name": group.name,
                    "expires_at": expires_at,
                }),
            ))
            .await;

        info!(
            target_user = %target_user,
            group_id = %group_id,
            assigned_by = %assigned_by,
            "User added to permission group"
        );
        Ok(membership)
    }

    /// Soft-remove a user from a group. Returns whether an active
    /// membership existed.
    pub async fn remove_user_from_group(
        &self,
        target_user: Uuid,
        group_id: Uuid,
        removed_by: Uuid,
        reason: Option<String>,
    ) -> AppResult<bool> {
        let group = self.require_group(group_id).await?;

        let removed = self
            .store
            .deactivate_membership(target_user, group_id)
            .await?;

        self.snapshots.invalidate_user(target_user);
        self.audit
            .record_flushed(mutation_entry(
                removed_by,
                AuditActionType::PermissionChanged,
                None,
                RiskLevel::Medium,
                json!({
                    "change": "group_remove",
                    "target_user": target_user,
                    "group_id": group_id,
                    "group_name": group.name,
                    "removed": removed,
                    "reason": reason,
                }),
            ))
            .await;

        info!(
            target_user = %target_user,
            group_id = %group_id,
            removed_by = %removed_by,
            removed,
            "User removed from permission group"
        );
        Ok(removed)
    }

    /// Create a new permission group.
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
        created_by: Uuid,
    ) -> AppResult<PermissionGroup> {
        let group = self.store.create_group(name, description, color).await?;

        self.audit
            .record_flushed(mutation_entry(
                created_by,
                AuditActionType::PermissionChanged,
                None,
                RiskLevel::Medium,
                json!({
                    "change": "group_create",
                    "group_id": group.id,
                    "group_name": group.name,
                }),
            ))
            .await;

        info!(group_id = %group.id, name = %group.name, "Permission group created");
        Ok(group)
    }

    /// Set (upsert) a group's grant for one capability.
    ///
    /// Any member may be affected, so this clears the whole snapshot
    /// cache rather than tracking membership.
    pub async fn set_group_permission(
        &self,
        group_id: Uuid,
        module: &ModuleKey,
        action: &ActionKey,
        is_granted: bool,
        conditions: Option<PermissionConditions>,
        granted_by: Uuid,
    ) -> AppResult<GroupPermission> {
        let group = self.require_group(group_id).await?;
        let meta = self.require_capability(module, action).await?;

        let row = self
            .store
            .set_group_permission(
                group_id,
                meta.module_id,
                meta.action_id,
                is_granted,
                conditions.as_ref(),
                granted_by,
            )
            .await?;

        self.snapshots.clear();
        self.audit
            .record_flushed(mutation_entry(
                granted_by,
                AuditActionType::PermissionChanged,
                Some(&meta),
                audit::mutation_risk(meta.is_sensitive),
                json!({
                    "change": "group_grant_set",
                    "group_id": group_id,
                    "group_name": group.name,
                    "module": module.as_str(),
                    "action": action.as_str(),
                    "is_granted": is_granted,
                }),
            ))
            .await;

        info!(
            group_id = %group_id,
            capability = %format!("{module}:{action}"),
            is_granted,
            "Group permission set"
        );
        Ok(row)
    }

    /// Remove a group's grant for one capability. Returns whether a row
    /// existed.
    pub async fn remove_group_permission(
        &self,
        group_id: Uuid,
        module: &ModuleKey,
        action: &ActionKey,
        removed_by: Uuid,
    ) -> AppResult<bool> {
        let group = self.require_group(group_id).await?;
        let meta = self.require_capability(module, action).await?;

        let removed = self
            .store
            .remove_group_permission(group_id, meta.module_id, meta.action_id)
            .await?;

        self.snapshots.clear();
        self.audit
            .record_flushed(mutation_entry(
                removed_by,
                AuditActionType::PermissionChanged,
                Some(&meta),
                audit::mutation_risk(meta.is_sensitive),
                json!({
                    "change": "group_grant_removed",
                    "group_id": group_id,
                    "group_name": group.name,
                    "module": module.as_str(),
                    "action": action.as_str(),
                    "removed": removed,
                }),
            ))
            .await;

        Ok(removed)
    }

    /// Purge individual overrides that expired before `before`. Expired
    /// rows are already inert; this is the explicit cleanup.
    pub async fn purge_expired(&self, before: DateTime<Utc>, purged_by: Uuid) -> AppResult<u64> {
        let purged = self.store.purge_expired(before).await?;
        self.snapshots.clear();

        self.audit
            .record_flushed(mutation_entry(
                purged_by,
                AuditActionType::PermissionChanged,
                None,
                RiskLevel::Low,
                json!({
                    "change": "purge_expired",
                    "before": before,
                    "purged": purged,
                }),
            ))
            .await;

        info!(purged, "Expired individual permissions purged");
        Ok(purged)
    }

    async fn require_group(&self, group_id: Uuid) -> AppResult<PermissionGroup> {
        self.store
            .find_group(group_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Permission group {group_id} not found")))
    }
}

/// Sensitive grants carry a justification; enforce it at the boundary.
fn require_reason_if_sensitive(
    meta: &ModuleActionMeta,
    reason: Option<&str>,
    module: &ModuleKey,
    action: &ActionKey,
) -> AppResult<()> {
    if meta.is_sensitive && reason.map(str::trim).filter(|r| !r.is_empty()).is_none() {
        return Err(AppError::validation(format!(
            "A reason is required when granting sensitive capability '{module}:{action}'"
        )));
    }
    Ok(())
}

/// Build a mutation audit entry. Mutations originate from admin tooling,
/// not a till request, so the session fields stay empty.
fn mutation_entry(
    actor: Uuid,
    action_type: AuditActionType,
    meta: Option<&ModuleActionMeta>,
    risk_level: RiskLevel,
    details: serde_json::Value,
) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        user_id: Some(actor),
        action_type,
        module_id: meta.map(|m| m.module_id),
        action_id: meta.map(|m| m.action_id),
        ip_address: None,
        user_agent: None,
        session_id: None,
        risk_level,
        details: Some(details),
    }
}
