//! Per-user permission snapshot and its request-scoped cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use tillpoint_entity::permission::{GroupGrant, IndividualGrant};

/// The permissions of one user, loaded once per engine and keyed by
/// `"module:action"`.
///
/// Built from a single consistent read of the stores; all checks the
/// request performs against the same snapshot are read-consistent with
/// each other.
#[derive(Debug, Clone)]
pub struct UserPermissionSet {
    /// Individual overrides by capability key. The storage uniqueness
    /// constraint guarantees at most one per key.
    individual: HashMap<String, IndividualGrant>,
    /// Group grant rows by capability key. Several groups may grant the
    /// same capability.
    groups: HashMap<String, Vec<GroupGrant>>,
    /// When the snapshot was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl UserPermissionSet {
    /// Build a snapshot from loaded grant rows.
    pub fn build(individual: Vec<IndividualGrant>, groups: Vec<GroupGrant>) -> Self {
        let mut individual_map = HashMap::with_capacity(individual.len());
        for grant in individual {
            individual_map.insert(grant.capability_key(), grant);
        }

        let mut group_map: HashMap<String, Vec<GroupGrant>> = HashMap::new();
        for grant in groups {
            group_map.entry(grant.capability_key()).or_default().push(grant);
        }

        Self {
            individual: individual_map,
            groups: group_map,
            loaded_at: Utc::now(),
        }
    }

    /// The individual override for a capability, if any.
    pub fn individual(&self, capability: &str) -> Option<&IndividualGrant> {
        self.individual.get(capability)
    }

    /// The group grant rows for a capability.
    pub fn group_rows(&self, capability: &str) -> &[GroupGrant] {
        self.groups.get(capability).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the user has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.individual.is_empty() && self.groups.is_empty()
    }
}

/// Shared handle to the engine's per-user snapshots.
///
/// Owned by one engine (one request); mutation handlers hold a clone of
/// the handle as their invalidation channel instead of reaching into any
/// global state. There is deliberately no cross-request sharing: a new
/// request constructs a new engine and loads fresh snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<DashMap<Uuid, Arc<UserPermissionSet>>>,
}

impl SnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached snapshot for a user.
    pub fn get(&self, user_id: Uuid) -> Option<Arc<UserPermissionSet>> {
        self.inner.get(&user_id).map(|entry| entry.value().clone())
    }

    /// Cache a freshly loaded snapshot.
    pub fn insert(&self, user_id: Uuid, snapshot: Arc<UserPermissionSet>) {
        self.inner.insert(user_id, snapshot);
    }

    /// Drop the snapshot of one user so the next check reloads it.
    pub fn invalidate_user(&self, user_id: Uuid) {
        self.inner.remove(&user_id);
    }

    /// Drop every snapshot (group-level changes can affect any member).
    pub fn clear(&self) {
        self.inner.clear();
    }
}
