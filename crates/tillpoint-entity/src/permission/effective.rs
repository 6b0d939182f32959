//! Effective-grant projections loaded into the per-user permission snapshot.
//!
//! These rows are joined against the catalog so the engine can key them by
//! `"module:action"` without extra lookups. Group rows are pre-filtered to
//! active groups and active, non-expired memberships by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::conditions::PermissionConditions;
use super::individual::PermissionType;

/// One individual override, projected for resolution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IndividualGrant {
    /// The module key.
    pub module_key: String,
    /// The action key.
    pub action_key: String,
    /// Allow or deny.
    pub permission_type: PermissionType,
    /// Whether the capability is granted (allow rows only).
    pub is_granted: bool,
    /// Optional runtime constraints.
    #[sqlx(json(nullable))]
    pub conditions: Option<PermissionConditions>,
    /// When the override expires (None = never).
    pub expires_at: Option<DateTime<Utc>>,
}

impl IndividualGrant {
    /// The `"module:action"` capability key of this grant.
    pub fn capability_key(&self) -> String {
        format!("{}:{}", self.module_key, self.action_key)
    }

    /// Check if this override has expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}

/// One group-derived grant, projected for resolution.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupGrant {
    /// The group the grant comes from.
    pub group_id: Uuid,
    /// The group's display name (for the audit reasoning trail).
    pub group_name: String,
    /// The module key.
    pub module_key: String,
    /// The action key.
    pub action_key: String,
    /// Whether the group entry grants or withholds the capability.
    pub is_granted: bool,
    /// Optional runtime constraints.
    #[sqlx(json(nullable))]
    pub conditions: Option<PermissionConditions>,
}

impl GroupGrant {
    /// The `"module:action"` capability key of this grant.
    pub fn capability_key(&self) -> String {
        format!("{}:{}", self.module_key, self.action_key)
    }
}
