//! Request-scoped permission resolution engine.
//!
//! An engine is constructed fresh per request with the request's
//! [`CheckContext`]. It loads the catalog once and each checked user's
//! permissions once, answers any number of checks against that snapshot,
//! and records every decision in the audit log.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::error;

use tillpoint_core::error::AppError;
use tillpoint_core::result::AppResult;
use tillpoint_core::types::keys::{self, ActionKey, ModuleKey};
use tillpoint_entity::audit::{AuditActionType, CreateAuditLogEntry, RiskLevel};
use tillpoint_entity::catalog::ModuleActionMeta;

use crate::audit::{self, AuditRecorder};
use crate::catalog::CatalogIndex;
use crate::context::{CheckContext, ResourceRef, Subject};
use crate::decision::{self, Decision, DecisionRule};
use crate::matrix::{MatrixAction, MatrixModule, PermissionMatrix};
use crate::snapshot::{SnapshotCache, UserPermissionSet};
use crate::store::PolicyStore;

/// The permission resolution engine.
#[derive(Clone)]
pub struct PolicyEngine {
    store: Arc<dyn PolicyStore>,
    audit: AuditRecorder,
    ctx: CheckContext,
    snapshots: SnapshotCache,
    catalog: Arc<OnceCell<Arc<CatalogIndex>>>,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine").field("ctx", &self.ctx).finish()
    }
}

impl PolicyEngine {
    /// Create an engine with a fresh snapshot cache.
    pub fn new(store: Arc<dyn PolicyStore>, audit: AuditRecorder, ctx: CheckContext) -> Self {
        Self::with_cache(store, audit, ctx, SnapshotCache::new())
    }

    /// Create an engine over an existing snapshot cache handle.
    ///
    /// The same handle is given to the mutation API so that grants,
    /// revokes, and membership changes invalidate exactly this engine's
    /// view.
    pub fn with_cache(
        store: Arc<dyn PolicyStore>,
        audit: AuditRecorder,
        ctx: CheckContext,
        snapshots: SnapshotCache,
    ) -> Self {
        Self {
            store,
            audit,
            ctx,
            snapshots,
            catalog: Arc::new(OnceCell::new()),
        }
    }

    /// A clone of this engine's snapshot cache handle.
    pub fn snapshot_cache(&self) -> SnapshotCache {
        self.snapshots.clone()
    }

    /// The request context the engine was built with.
    pub fn context(&self) -> &CheckContext {
        &self.ctx
    }

    /// Load (once) and return the catalog index.
    async fn catalog_index(&self) -> AppResult<Arc<CatalogIndex>> {
        self.catalog
            .get_or_try_init(|| async {
                let data = self.store.load_catalog().await?;
                Ok::<_, AppError>(Arc::new(CatalogIndex::build(data)))
            })
            .await
            .map(Arc::clone)
    }

    /// Capability metadata, swallowing storage errors (audit tagging is
    /// best-effort once the decision itself is made).
    async fn capability_meta(
        &self,
        module: &ModuleKey,
        action: &ActionKey,
    ) -> Option<ModuleActionMeta> {
        match self.catalog_index().await {
            Ok(catalog) => catalog.capability(module, action).cloned(),
            Err(_) => None,
        }
    }

    /// Load (at most once per user per engine) a user's permission snapshot.
    async fn load_snapshot(&self, user_id: uuid::Uuid) -> AppResult<Arc<UserPermissionSet>> {
        if let Some(snapshot) = self.snapshots.get(user_id) {
            return Ok(snapshot);
        }
        let individual = self.store.individual_grants(user_id).await?;
        let groups = self.store.group_grants(user_id).await?;
        let snapshot = Arc::new(UserPermissionSet::build(individual, groups));
        self.snapshots.insert(user_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Resolve one check without audit side effects.
    async fn resolve_check(
        &self,
        subject: &Subject,
        module: &ModuleKey,
        action: &ActionKey,
        resource: Option<&ResourceRef>,
    ) -> AppResult<(Decision, Option<ModuleActionMeta>)> {
        let catalog = self.catalog_index().await?;
        let meta = catalog.capability(module, action).cloned();
        let snapshot = self.load_snapshot(subject.user_id).await?;
        let capability = keys::capability_key(module, action);
        let condition_ctx = self.ctx.condition_context(resource);
        let decision = decision::resolve(
            subject.role,
            &snapshot,
            &capability,
            &condition_ctx,
            Utc::now(),
        );
        Ok((decision, meta))
    }

    /// Check whether the subject holds a capability.
    ///
    /// Never fails: a missing subject denies immediately, and a storage
    /// failure fails closed (deny) after being reported. Exactly one audit
    /// entry is written per call.
    pub async fn has_permission(
        &self,
        subject: Option<&Subject>,
        module: &ModuleKey,
        action: &ActionKey,
        resource: Option<&ResourceRef>,
    ) -> bool {
        let (decision, meta) = match subject {
            None => (Decision::deny(DecisionRule::MissingSubject), None),
            Some(subject) => match self.resolve_check(subject, module, action, resource).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    error!(
                        error = %e,
                        module = %module,
                        action = %action,
                        "Permission resolution failed; denying"
                    );
                    (Decision::deny(DecisionRule::StorageFailure), None)
                }
            },
        };

        let action_type = if decision.granted {
            AuditActionType::PermissionCheck
        } else {
            AuditActionType::PermissionDenied
        };
        let is_sensitive = meta.as_ref().map(|m| m.is_sensitive).unwrap_or(false);
        self.audit.record(self.entry(
            subject,
            action_type,
            meta.as_ref(),
            audit::check_risk(is_sensitive, decision.granted),
            decision_details(module, action, &decision),
        ));

        decision.granted
    }

    /// Hard gate: fail the caller's operation unless the subject holds
    /// the capability.
    ///
    /// A denial writes an additional `policy_violation` entry on top of
    /// the check entry, and surfaces as a recoverable [`AppError`] whose
    /// message carries no policy detail.
    pub async fn require_permission(
        &self,
        subject: Option<&Subject>,
        module: &ModuleKey,
        action: &ActionKey,
        resource: Option<&ResourceRef>,
    ) -> AppResult<()> {
        if self.has_permission(subject, module, action, resource).await {
            return Ok(());
        }

        let meta = self.capability_meta(module, action).await;
        let is_sensitive = meta.as_ref().map(|m| m.is_sensitive).unwrap_or(false);
        self.audit.record(self.entry(
            subject,
            AuditActionType::PolicyViolation,
            meta.as_ref(),
            audit::violation_risk(is_sensitive),
            json!({
                "module": module.as_str(),
                "action": action.as_str(),
                "gate": "require_permission",
            }),
        ));

        Err(AppError::access_denied("Access denied"))
    }

    /// Record that an approved sensitive operation was executed.
    ///
    /// Callers performing the operation (refund, void, ...) invoke this
    /// after their own gate passed; the entry is flushed because the
    /// compliance trail depends on it.
    pub async fn record_sensitive_action(
        &self,
        subject: &Subject,
        module: &ModuleKey,
        action: &ActionKey,
        details: Option<serde_json::Value>,
    ) {
        let meta = self.capability_meta(module, action).await;
        let details = details.unwrap_or_else(|| {
            json!({ "module": module.as_str(), "action": action.as_str() })
        });
        self.audit
            .record_flushed(self.entry(
                Some(subject),
                AuditActionType::SensitiveAction,
                meta.as_ref(),
                RiskLevel::High,
                details,
            ))
            .await;
    }

    /// Project the full permission matrix for a subject.
    ///
    /// Cells resolve through the same core as `has_permission` but write
    /// no audit entries; the projection is a read-only rendering aid, not
    /// a series of access decisions. No subject projects an all-false
    /// matrix.
    pub async fn permission_matrix(
        &self,
        subject: Option<&Subject>,
    ) -> AppResult<PermissionMatrix> {
        let catalog = self.catalog_index().await?;
        let snapshot = match subject {
            Some(subject) => Some(self.load_snapshot(subject.user_id).await?),
            None => None,
        };
        let condition_ctx = self.ctx.condition_context(None);
        let now = Utc::now();

        let mut modules = Vec::with_capacity(catalog.modules().len());
        for module in catalog.modules() {
            let mut actions = Vec::new();
            for action in catalog.actions_for_module(module.id) {
                let has_permission = match (subject, &snapshot) {
                    (Some(subject), Some(snapshot)) => {
                        let capability = format!("{}:{}", module.key, action.key);
                        decision::resolve(
                            subject.role,
                            snapshot,
                            &capability,
                            &condition_ctx,
                            now,
                        )
                        .granted
                    }
                    _ => false,
                };
                actions.push(MatrixAction {
                    key: action.key.clone(),
                    display_name: action.display_name.clone(),
                    is_sensitive: action.is_sensitive,
                    requires_approval: action.requires_approval,
                    has_permission,
                });
            }
            modules.push(MatrixModule {
                key: module.key.clone(),
                display_name: module.display_name.clone(),
                icon: module.icon.clone(),
                actions,
            });
        }

        Ok(PermissionMatrix { modules })
    }

    /// Build an audit entry stamped with this request's context.
    fn entry(
        &self,
        subject: Option<&Subject>,
        action_type: AuditActionType,
        meta: Option<&ModuleActionMeta>,
        risk_level: RiskLevel,
        details: serde_json::Value,
    ) -> CreateAuditLogEntry {
        CreateAuditLogEntry {
            user_id: subject.map(|s| s.user_id),
            action_type,
            module_id: meta.map(|m| m.module_id),
            action_id: meta.map(|m| m.action_id),
            ip_address: self.ctx.ip_address.clone(),
            user_agent: self.ctx.user_agent.clone(),
            session_id: self.ctx.session_id,
            risk_level,
            details: Some(details),
        }
    }
}

/// The reasoning trail recorded for administrators: which rule fired and,
/// when a condition rejected the check, which one.
fn decision_details(
    module: &ModuleKey,
    action: &ActionKey,
    decision: &Decision,
) -> serde_json::Value {
    let mut details = json!({
        "module": module.as_str(),
        "action": action.as_str(),
        "rule": decision.rule.as_str(),
    });
    if let Some(group) = &decision.source_group {
        details["group"] = json!(group);
    }
    if let Some(failure) = decision.condition_failure {
        details["condition"] = json!(failure.as_str());
    }
    details
}
