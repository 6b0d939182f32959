//! Individual permission override entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::conditions::PermissionConditions;

/// Whether an individual override allows or denies the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "permission_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    /// The override grants the capability (subject to conditions).
    Allow,
    /// The override denies the capability regardless of group policy.
    Deny,
}

impl PermissionType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl std::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-user override of one (module, action) capability.
///
/// At most one row exists per (user, module, action); individual rows take
/// precedence over group rows during resolution. Expired rows are inert
/// but stay in storage until explicitly purged.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IndividualPermission {
    /// Unique override identifier.
    pub id: Uuid,
    /// The user this override applies to.
    pub user_id: Uuid,
    /// The module being overridden.
    pub module_id: Uuid,
    /// The action being overridden.
    pub action_id: Uuid,
    /// Allow or deny.
    pub permission_type: PermissionType,
    /// Whether the capability is granted (only meaningful for allow rows;
    /// a deny row denies regardless).
    pub is_granted: bool,
    /// Optional runtime constraints on the grant.
    #[sqlx(json(nullable))]
    pub conditions: Option<PermissionConditions>,
    /// When this override expires (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// Admin who recorded the override.
    pub granted_by: Uuid,
    /// Free-text justification. Required in practice for sensitive grants.
    pub reason: Option<String>,
    /// When the override was first created.
    pub created_at: DateTime<Utc>,
    /// When the override was last upserted.
    pub updated_at: DateTime<Utc>,
}

impl IndividualPermission {
    /// Check if this override has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| exp <= Utc::now())
            .unwrap_or(false)
    }
}
