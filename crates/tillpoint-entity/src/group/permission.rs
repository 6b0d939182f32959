//! Group permission entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permission::PermissionConditions;

/// A grant of one (module, action) capability to a group.
///
/// At most one row exists per (group, module, action). A row with
/// `is_granted = false` withholds the capability from the group but never
/// overrides another group's grant; explicit per-user denies are expressed
/// as individual overrides instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupPermission {
    /// Unique grant identifier.
    pub id: Uuid,
    /// The group the grant belongs to.
    pub group_id: Uuid,
    /// The module being granted.
    pub module_id: Uuid,
    /// The action being granted.
    pub action_id: Uuid,
    /// Whether the capability is granted.
    pub is_granted: bool,
    /// Optional runtime constraints on the grant.
    #[sqlx(json(nullable))]
    pub conditions: Option<PermissionConditions>,
    /// Admin who recorded the grant.
    pub granted_by: Uuid,
    /// When the grant was recorded.
    pub created_at: DateTime<Utc>,
}
