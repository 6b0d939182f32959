//! Engine-level tests over in-memory store and audit doubles.
//!
//! These exercise the full resolution path (snapshot loading, caching,
//! invalidation, condition evaluation, audit emission) without a live
//! database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use uuid::Uuid;

use tillpoint_core::error::ErrorKind;
use tillpoint_core::result::AppResult;
use tillpoint_core::types::keys::{ActionKey, ModuleKey};
use tillpoint_entity::audit::{AuditActionType, CreateAuditLogEntry};
use tillpoint_entity::catalog::{ModuleActionEdge, ModuleActionMeta, PosAction, PosModule};
use tillpoint_entity::group::{GroupPermission, PermissionGroup, UserGroupMembership};
use tillpoint_entity::permission::{
    GroupGrant, IndividualGrant, IndividualPermission, PermissionConditions, PermissionType,
};
use tillpoint_entity::user::StaffRole;
use tillpoint_policy::{
    AuditRecorder, AuditSink, CatalogData, CheckContext, GrantOptions, IndividualUpsert,
    PermissionAdmin, PolicyEngine, PolicyStore, ResourceRef, Subject,
};

// ── In-memory doubles ──────────────────────────────────────

struct MemoryStore {
    modules: Vec<PosModule>,
    actions: Vec<PosAction>,
    edges: Vec<ModuleActionEdge>,
    individual: Mutex<Vec<IndividualPermission>>,
    groups: Mutex<Vec<PermissionGroup>>,
    group_permissions: Mutex<Vec<GroupPermission>>,
    memberships: Mutex<Vec<UserGroupMembership>>,
}

fn module(key: &str, sort_order: i32) -> PosModule {
    PosModule {
        id: Uuid::new_v4(),
        key: key.to_string(),
        display_name: key.to_string(),
        description: None,
        icon: None,
        sort_order,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn action(key: &str, is_sensitive: bool) -> PosAction {
    PosAction {
        id: Uuid::new_v4(),
        key: key.to_string(),
        display_name: key.to_string(),
        description: None,
        is_sensitive,
        requires_approval: is_sensitive,
        created_at: Utc::now(),
    }
}

impl MemoryStore {
    /// Catalog: sales {view, refund}, inventory {view}. Refund is
    /// sensitive.
    fn new() -> Self {
        let modules = vec![module("sales", 1), module("inventory", 2)];
        let actions = vec![action("view", false), action("refund", true)];

        let mut edges = Vec::new();
        for (module_key, action_key, is_default) in [
            ("sales", "view", true),
            ("sales", "refund", false),
            ("inventory", "view", true),
        ] {
            let m = modules.iter().find(|m| m.key == module_key).unwrap();
            let a = actions.iter().find(|a| a.key == action_key).unwrap();
            edges.push(ModuleActionEdge {
                id: Uuid::new_v4(),
                module_id: m.id,
                action_id: a.id,
                is_default,
            });
        }

        Self {
            modules,
            actions,
            edges,
            individual: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            group_permissions: Mutex::new(Vec::new()),
            memberships: Mutex::new(Vec::new()),
        }
    }

    fn capability_ids(&self, module_key: &str, action_key: &str) -> (Uuid, Uuid) {
        let m = self.modules.iter().find(|m| m.key == module_key).unwrap();
        let a = self.actions.iter().find(|a| a.key == action_key).unwrap();
        (m.id, a.id)
    }

    fn module_key_of(&self, module_id: Uuid) -> String {
        self.modules
            .iter()
            .find(|m| m.id == module_id)
            .unwrap()
            .key
            .clone()
    }

    fn action_key_of(&self, action_id: Uuid) -> String {
        self.actions
            .iter()
            .find(|a| a.id == action_id)
            .unwrap()
            .key
            .clone()
    }

    fn individual_row_count(&self) -> usize {
        self.individual.lock().unwrap().len()
    }

    fn seed_group(&self, name: &str) -> Uuid {
        let group = PermissionGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            color: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let id = group.id;
        self.groups.lock().unwrap().push(group);
        id
    }

    fn seed_group_grant(
        &self,
        group_id: Uuid,
        module_key: &str,
        action_key: &str,
        conditions: Option<PermissionConditions>,
    ) {
        let (module_id, action_id) = self.capability_ids(module_key, action_key);
        self.group_permissions.lock().unwrap().push(GroupPermission {
            id: Uuid::new_v4(),
            group_id,
            module_id,
            action_id,
            is_granted: true,
            conditions,
            granted_by: Uuid::new_v4(),
            created_at: Utc::now(),
        });
    }

    fn seed_membership(&self, user_id: Uuid, group_id: Uuid) {
        self.memberships.lock().unwrap().push(UserGroupMembership {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            assigned_by: Uuid::new_v4(),
            assigned_at: Utc::now(),
            expires_at: None,
            is_active: true,
        });
    }

    fn seed_individual(
        &self,
        user_id: Uuid,
        module_key: &str,
        action_key: &str,
        permission_type: PermissionType,
        is_granted: bool,
        conditions: Option<PermissionConditions>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let (module_id, action_id) = self.capability_ids(module_key, action_key);
        self.individual.lock().unwrap().push(IndividualPermission {
            id: Uuid::new_v4(),
            user_id,
            module_id,
            action_id,
            permission_type,
            is_granted,
            conditions,
            expires_at,
            granted_by: Uuid::new_v4(),
            reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn load_catalog(&self) -> AppResult<CatalogData> {
        Ok(CatalogData {
            modules: self.modules.clone(),
            actions: self.actions.clone(),
            edges: self.edges.clone(),
        })
    }

    async fn find_capability(
        &self,
        module_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ModuleActionMeta>> {
        let Some(m) = self.modules.iter().find(|m| m.key == module_key) else {
            return Ok(None);
        };
        let Some(a) = self.actions.iter().find(|a| a.key == action_key) else {
            return Ok(None);
        };
        let edge = self
            .edges
            .iter()
            .find(|e| e.module_id == m.id && e.action_id == a.id);
        Ok(edge.map(|e| ModuleActionMeta {
            module_id: m.id,
            action_id: a.id,
            module_key: m.key.clone(),
            action_key: a.key.clone(),
            is_sensitive: a.is_sensitive,
            requires_approval: a.requires_approval,
            is_default: e.is_default,
        }))
    }

    async fn individual_grants(&self, user_id: Uuid) -> AppResult<Vec<IndividualGrant>> {
        let now = Utc::now();
        Ok(self
            .individual
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .filter(|row| row.expires_at.map(|exp| exp > now).unwrap_or(true))
            .map(|row| IndividualGrant {
                module_key: self.module_key_of(row.module_id),
                action_key: self.action_key_of(row.action_id),
                permission_type: row.permission_type,
                is_granted: row.is_granted,
                conditions: row.conditions.clone(),
                expires_at: row.expires_at,
            })
            .collect())
    }

    async fn group_grants(&self, user_id: Uuid) -> AppResult<Vec<GroupGrant>> {
        let now = Utc::now();
        let memberships = self.memberships.lock().unwrap();
        let groups = self.groups.lock().unwrap();
        let active_groups: Vec<&PermissionGroup> = memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_effective_at(now))
            .filter_map(|m| groups.iter().find(|g| g.id == m.group_id && g.is_active))
            .collect();

        Ok(self
            .group_permissions
            .lock()
            .unwrap()
            .iter()
            .filter_map(|gp| {
                let group = active_groups.iter().find(|g| g.id == gp.group_id)?;
                Some(GroupGrant {
                    group_id: group.id,
                    group_name: group.name.clone(),
                    module_key: self.module_key_of(gp.module_id),
                    action_key: self.action_key_of(gp.action_id),
                    is_granted: gp.is_granted,
                    conditions: gp.conditions.clone(),
                })
            })
            .collect())
    }

    async fn upsert_individual(
        &self,
        upsert: &IndividualUpsert,
    ) -> AppResult<IndividualPermission> {
        let mut rows = self.individual.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| {
            row.user_id == upsert.user_id
                && row.module_id == upsert.module_id
                && row.action_id == upsert.action_id
        }) {
            row.permission_type = upsert.permission_type;
            row.is_granted = upsert.is_granted;
            row.conditions = upsert.conditions.clone();
            row.expires_at = upsert.expires_at;
            row.granted_by = upsert.granted_by;
            row.reason = upsert.reason.clone();
            row.updated_at = Utc::now();
            return Ok(row.clone());
        }
        let row = IndividualPermission {
            id: Uuid::new_v4(),
            user_id: upsert.user_id,
            module_id: upsert.module_id,
            action_id: upsert.action_id,
            permission_type: upsert.permission_type,
            is_granted: upsert.is_granted,
            conditions: upsert.conditions.clone(),
            expires_at: upsert.expires_at,
            granted_by: upsert.granted_by,
            reason: upsert.reason.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete_individual(
        &self,
        user_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool> {
        let mut rows = self.individual.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| {
            !(row.user_id == user_id && row.module_id == module_id && row.action_id == action_id)
        });
        Ok(rows.len() < before)
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.individual.lock().unwrap();
        let count = rows.len();
        rows.retain(|row| row.expires_at.map(|exp| exp >= before).unwrap_or(true));
        Ok((count - rows.len()) as u64)
    }

    async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> AppResult<PermissionGroup> {
        let group = PermissionGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            color: color.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        };
        self.groups.lock().unwrap().push(group.clone());
        Ok(group)
    }

    async fn find_group(&self, group_id: Uuid) -> AppResult<Option<PermissionGroup>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id == group_id)
            .cloned())
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
        let mut rows = self.group_permissions.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| {
            row.group_id == group_id && row.module_id == module_id && row.action_id == action_id
        }) {
            row.is_granted = is_granted;
            row.conditions = conditions.cloned();
            row.granted_by = granted_by;
            return Ok(row.clone());
        }
        let row = GroupPermission {
            id: Uuid::new_v4(),
            group_id,
            module_id,
            action_id,
            is_granted,
            conditions: conditions.cloned(),
            granted_by,
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn remove_group_permission(
        &self,
        group_id: Uuid,
        module_id: Uuid,
        action_id: Uuid,
    ) -> AppResult<bool> {
        let mut rows = self.group_permissions.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| {
            !(row.group_id == group_id && row.module_id == module_id && row.action_id == action_id)
        });
        Ok(rows.len() < before)
    }

    async fn upsert_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        assigned_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserGroupMembership> {
        let mut rows = self.memberships.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.user_id == user_id && row.group_id == group_id)
        {
            row.assigned_by = assigned_by;
            row.expires_at = expires_at;
            row.is_active = true;
            row.assigned_at = Utc::now();
            return Ok(row.clone());
        }
        let row = UserGroupMembership {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            assigned_by,
            assigned_at: Utc::now(),
            expires_at,
            is_active: true,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn deactivate_membership(&self, user_id: Uuid, group_id: Uuid) -> AppResult<bool> {
        let mut rows = self.memberships.lock().unwrap();
        for row in rows.iter_mut() {
            if row.user_id == user_id && row.group_id == group_id && row.is_active {
                row.is_active = false;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[derive(Default)]
struct MemoryAudit {
    entries: Mutex<Vec<CreateAuditLogEntry>>,
}

impl MemoryAudit {
    fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn count_of(&self, action_type: AuditActionType) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.action_type == action_type)
            .count()
    }

    fn last(&self) -> CreateAuditLogEntry {
        self.entries.lock().unwrap().last().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn append(&self, entry: CreateAuditLogEntry) -> AppResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

// ── Harness ────────────────────────────────────────────────

struct Harness {
    store: Arc<MemoryStore>,
    audit_log: Arc<MemoryAudit>,
    recorder: AuditRecorder,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit_log = Arc::new(MemoryAudit::default());
        let recorder = AuditRecorder::spawn(audit_log.clone(), 64);
        Self {
            store,
            audit_log,
            recorder,
        }
    }

    fn engine(&self) -> PolicyEngine {
        self.engine_at(CheckContext::new())
    }

    fn engine_at(&self, ctx: CheckContext) -> PolicyEngine {
        PolicyEngine::new(self.store.clone(), self.recorder.clone(), ctx)
    }

    fn admin_for(&self, engine: &PolicyEngine) -> PermissionAdmin {
        PermissionAdmin::new(
            self.store.clone(),
            self.recorder.clone(),
            engine.snapshot_cache(),
        )
    }
}

fn sales() -> ModuleKey {
    ModuleKey::new("sales").unwrap()
}

fn refund() -> ActionKey {
    ActionKey::new("refund").unwrap()
}

fn view() -> ActionKey {
    ActionKey::new("view").unwrap()
}

fn cashier() -> Subject {
    Subject::new(Uuid::new_v4(), StaffRole::Cashier)
}

fn local_at_hour(hour: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 6, 2, hour, 30, 0).unwrap()
}

// ── Resolution properties ──────────────────────────────────

#[tokio::test]
async fn test_default_deny_without_any_rows() {
    let harness = Harness::new();
    let engine = harness.engine();
    let subject = cashier();

    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );
}

#[tokio::test]
async fn test_role_bypass_is_absolute() {
    let harness = Harness::new();
    let admin_user = Subject::new(Uuid::new_v4(), StaffRole::Admin);
    // Even an explicit individual deny cannot lock out an elevated role.
    harness.store.seed_individual(
        admin_user.user_id,
        "sales",
        "refund",
        PermissionType::Deny,
        false,
        None,
        None,
    );

    let engine = harness.engine();
    assert!(
        engine
            .has_permission(Some(&admin_user), &sales(), &refund(), None)
            .await
    );
}

#[tokio::test]
async fn test_individual_deny_beats_group_grant() {
    let harness = Harness::new();
    let subject = cashier();

    let group_id = harness.store.seed_group("floor-staff");
    harness.store.seed_group_grant(group_id, "sales", "refund", None);
    harness.store.seed_membership(subject.user_id, group_id);
    harness.store.seed_individual(
        subject.user_id,
        "sales",
        "refund",
        PermissionType::Deny,
        false,
        None,
        None,
    );

    let engine = harness.engine();
    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );
}

#[tokio::test]
async fn test_expired_individual_falls_through_to_group() {
    let harness = Harness::new();
    let subject = cashier();

    let group_id = harness.store.seed_group("floor-staff");
    harness.store.seed_group_grant(group_id, "sales", "refund", None);
    harness.store.seed_membership(subject.user_id, group_id);
    harness.store.seed_individual(
        subject.user_id,
        "sales",
        "refund",
        PermissionType::Deny,
        false,
        None,
        Some(Utc::now() - Duration::days(1)),
    );

    let engine = harness.engine();
    assert!(
        engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );
}

#[tokio::test]
async fn test_group_grant_stops_after_soft_removal() {
    let harness = Harness::new();
    let subject = cashier();
    let operator = Uuid::new_v4();

    let group_id = harness.store.seed_group("floor-staff");
    harness.store.seed_group_grant(group_id, "sales", "view", None);
    harness.store.seed_membership(subject.user_id, group_id);

    let engine = harness.engine();
    let admin = harness.admin_for(&engine);

    assert!(
        engine
            .has_permission(Some(&subject), &sales(), &view(), None)
            .await
    );

    // Soft removal invalidates the cached snapshot; the next resolution
    // sees no membership.
    admin
        .remove_user_from_group(subject.user_id, group_id, operator, None)
        .await
        .unwrap();

    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &view(), None)
            .await
    );
}

#[tokio::test]
async fn test_amount_limit_semantics() {
    let harness = Harness::new();
    let subject = cashier();
    harness.store.seed_individual(
        subject.user_id,
        "sales",
        "refund",
        PermissionType::Allow,
        true,
        Some(PermissionConditions::amount_limit(1000)),
        None,
    );

    let engine = harness.engine();

    // Amount-gated grants fail closed without a resource.
    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );
    assert!(
        !engine
            .has_permission(
                Some(&subject),
                &sales(),
                &refund(),
                Some(&ResourceRef::amount(1500))
            )
            .await
    );
    assert!(
        engine
            .has_permission(
                Some(&subject),
                &sales(),
                &refund(),
                Some(&ResourceRef::amount(500))
            )
            .await
    );
}

#[tokio::test]
async fn test_time_window_scenario() {
    let harness = Harness::new();
    let subject = cashier();
    let operator = Uuid::new_v4();

    // No rows anywhere: default deny.
    let engine = harness.engine_at(CheckContext::new().with_request_time(local_at_hour(10)));
    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );

    let admin = harness.admin_for(&engine);
    admin
        .grant_permission(
            subject.user_id,
            &sales(),
            &refund(),
            operator,
            GrantOptions {
                conditions: Some(PermissionConditions::time_window(9, 17)),
                reason: Some("shift lead cover".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Inside the window.
    assert!(
        engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );

    // Same grant, checked at hour 20: outside the window.
    let evening = harness.engine_at(CheckContext::new().with_request_time(local_at_hour(20)));
    assert!(
        !evening
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );
}

#[tokio::test]
async fn test_missing_subject_denies_and_logs() {
    let harness = Harness::new();
    let engine = harness.engine();

    assert!(!engine.has_permission(None, &sales(), &view(), None).await);

    harness.recorder.flush().await;
    assert_eq!(harness.audit_log.count(), 1);
    let entry = harness.audit_log.last();
    assert_eq!(entry.action_type, AuditActionType::PermissionDenied);
    assert_eq!(entry.user_id, None);
}

// ── Audit properties ───────────────────────────────────────

#[tokio::test]
async fn test_each_check_writes_exactly_one_entry() {
    let harness = Harness::new();
    let subject = cashier();
    let group_id = harness.store.seed_group("floor-staff");
    harness.store.seed_group_grant(group_id, "sales", "view", None);
    harness.store.seed_membership(subject.user_id, group_id);

    let engine = harness.engine();
    assert!(
        engine
            .has_permission(Some(&subject), &sales(), &view(), None)
            .await
    );
    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &refund(), None)
            .await
    );

    harness.recorder.flush().await;
    assert_eq!(harness.audit_log.count(), 2);
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PermissionCheck),
        1
    );
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PermissionDenied),
        1
    );
}

#[tokio::test]
async fn test_require_permission_adds_policy_violation() {
    let harness = Harness::new();
    let subject = cashier();
    let engine = harness.engine();

    let err = engine
        .require_permission(Some(&subject), &sales(), &refund(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    harness.recorder.flush().await;
    assert_eq!(harness.audit_log.count(), 2);
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PermissionDenied),
        1
    );
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PolicyViolation),
        1
    );
}

#[tokio::test]
async fn test_each_mutation_writes_exactly_one_entry() {
    let harness = Harness::new();
    let subject = cashier();
    let operator = Uuid::new_v4();
    let engine = harness.engine();
    let admin = harness.admin_for(&engine);

    admin
        .grant_permission(
            subject.user_id,
            &sales(),
            &view(),
            operator,
            GrantOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(harness.audit_log.count(), 1);
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PermissionGranted),
        1
    );

    admin
        .revoke_permission(subject.user_id, &sales(), &view(), operator, None)
        .await
        .unwrap();
    assert_eq!(harness.audit_log.count(), 2);
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PermissionChanged),
        1
    );

    let group = admin
        .create_group("evening-shift", None, None, operator)
        .await
        .unwrap();
    admin
        .add_user_to_group(subject.user_id, group.id, operator, None)
        .await
        .unwrap();
    admin
        .remove_user_from_group(subject.user_id, group.id, operator, None)
        .await
        .unwrap();
    assert_eq!(harness.audit_log.count(), 5);
    assert_eq!(
        harness.audit_log.count_of(AuditActionType::PermissionChanged),
        4
    );
}

// ── Mutation API ───────────────────────────────────────────

#[tokio::test]
async fn test_grant_is_idempotent_upsert() {
    let harness = Harness::new();
    let subject = cashier();
    let operator = Uuid::new_v4();
    let engine = harness.engine();
    let admin = harness.admin_for(&engine);

    for _ in 0..2 {
        admin
            .grant_permission(
                subject.user_id,
                &sales(),
                &view(),
                operator,
                GrantOptions::default(),
            )
            .await
            .unwrap();
    }

    assert_eq!(harness.store.individual_row_count(), 1);
}

#[tokio::test]
async fn test_unknown_capability_is_a_configuration_error() {
    let harness = Harness::new();
    let engine = harness.engine();
    let admin = harness.admin_for(&engine);

    let err = admin
        .grant_permission(
            Uuid::new_v4(),
            &ModuleKey::new("payroll").unwrap(),
            &view(),
            Uuid::new_v4(),
            GrantOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);

    // Inventory has no refund edge either: pair-level validation.
    let err = admin
        .grant_permission(
            Uuid::new_v4(),
            &ModuleKey::new("inventory").unwrap(),
            &refund(),
            Uuid::new_v4(),
            GrantOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test]
async fn test_sensitive_grant_requires_a_reason() {
    let harness = Harness::new();
    let subject = cashier();
    let operator = Uuid::new_v4();
    let engine = harness.engine();
    let admin = harness.admin_for(&engine);

    let err = admin
        .grant_permission(
            subject.user_id,
            &sales(),
            &refund(),
            operator,
            GrantOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    admin
        .grant_permission(
            subject.user_id,
            &sales(),
            &refund(),
            operator,
            GrantOptions {
                reason: Some("covering supervisor shift".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deny_override_created_by_admin_blocks_group_grant() {
    let harness = Harness::new();
    let subject = cashier();
    let operator = Uuid::new_v4();

    let group_id = harness.store.seed_group("floor-staff");
    harness.store.seed_group_grant(group_id, "sales", "view", None);
    harness.store.seed_membership(subject.user_id, group_id);

    let engine = harness.engine();
    let admin = harness.admin_for(&engine);

    assert!(
        engine
            .has_permission(Some(&subject), &sales(), &view(), None)
            .await
    );

    admin
        .deny_permission(
            subject.user_id,
            &sales(),
            &view(),
            operator,
            GrantOptions::default(),
        )
        .await
        .unwrap();

    assert!(
        !engine
            .has_permission(Some(&subject), &sales(), &view(), None)
            .await
    );

    // Revoking the deny override falls back to group resolution.
    admin
        .revoke_permission(subject.user_id, &sales(), &view(), operator, None)
        .await
        .unwrap();
    assert!(
        engine
            .has_permission(Some(&subject), &sales(), &view(), None)
            .await
    );
}

// ── Matrix projection ──────────────────────────────────────

#[tokio::test]
async fn test_permission_matrix_projection() {
    let harness = Harness::new();
    let subject = cashier();
    let group_id = harness.store.seed_group("floor-staff");
    harness.store.seed_group_grant(group_id, "sales", "view", None);
    harness.store.seed_membership(subject.user_id, group_id);

    let engine = harness.engine();
    let matrix = engine.permission_matrix(Some(&subject)).await.unwrap();

    assert_eq!(matrix.modules.len(), 2);
    let sales_module = &matrix.modules[0];
    assert_eq!(sales_module.key, "sales");

    let view_cell = sales_module
        .actions
        .iter()
        .find(|a| a.key == "view")
        .unwrap();
    assert!(view_cell.has_permission);
    assert!(!view_cell.is_sensitive);

    let refund_cell = sales_module
        .actions
        .iter()
        .find(|a| a.key == "refund")
        .unwrap();
    assert!(!refund_cell.has_permission);
    assert!(refund_cell.is_sensitive);

    // Matrix cells are a projection, not access decisions: no audit spam.
    harness.recorder.flush().await;
    assert_eq!(harness.audit_log.count(), 0);
}

#[tokio::test]
async fn test_matrix_without_subject_is_all_false() {
    let harness = Harness::new();
    let engine = harness.engine();
    let matrix = engine.permission_matrix(None).await.unwrap();
    assert!(
        matrix
            .modules
            .iter()
            .flat_map(|m| m.actions.iter())
            .all(|a| !a.has_permission)
    );
}
