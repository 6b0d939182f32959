//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// What kind of event an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditActionType {
    /// A permission check that resolved to grant.
    PermissionCheck,
    /// A permission check that resolved to deny.
    PermissionDenied,
    /// An administrative grant of an individual permission.
    PermissionGranted,
    /// Any other administrative permission change (revoke, deny override,
    /// membership or group-grant change).
    PermissionChanged,
    /// A hard gate (`require_permission`) rejected the caller.
    PolicyViolation,
    /// A sensitive business operation was executed after approval.
    SensitiveAction,
}

impl AuditActionType {
    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionCheck => "permission_check",
            Self::PermissionDenied => "permission_denied",
            Self::PermissionGranted => "permission_granted",
            Self::PermissionChanged => "permission_changed",
            Self::PolicyViolation => "policy_violation",
            Self::SensitiveAction => "sensitive_action",
        }
    }
}

impl std::fmt::Display for AuditActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk classification of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "risk_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine activity.
    Low,
    /// Worth a second look during review.
    Medium,
    /// Likely to be reviewed (denied sensitive checks, admin mutations).
    High,
    /// Requires review (violations on sensitive capabilities).
    Critical,
}

impl RiskLevel {
    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit log entry recording a permission decision or an
/// administrative change. The engine only ever appends these.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    /// Unique audit entry identifier.
    pub id: Uuid,
    /// The acting user (None for anonymous/missing subjects).
    pub user_id: Option<Uuid>,
    /// What kind of event this records.
    pub action_type: AuditActionType,
    /// The module involved (None for entries that are not module-scoped,
    /// e.g. group membership changes).
    pub module_id: Option<Uuid>,
    /// The action involved.
    pub action_id: Option<Uuid>,
    /// IP address of the actor.
    pub ip_address: Option<String>,
    /// User-Agent of the actor.
    pub user_agent: Option<String>,
    /// The actor's session.
    pub session_id: Option<Uuid>,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Reasoning trail and free-text details (JSON).
    pub details: Option<serde_json::Value>,
    /// When the event occurred.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    /// The acting user.
    pub user_id: Option<Uuid>,
    /// What kind of event this records.
    pub action_type: AuditActionType,
    /// The module involved.
    pub module_id: Option<Uuid>,
    /// The action involved.
    pub action_id: Option<Uuid>,
    /// Actor's IP address.
    pub ip_address: Option<String>,
    /// Actor's User-Agent.
    pub user_agent: Option<String>,
    /// The actor's session.
    pub session_id: Option<Uuid>,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Reasoning trail and free-text details.
    pub details: Option<serde_json::Value>,
}

/// Filters for administrative audit log review. All fields are optional
/// and combine with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLogFilter {
    /// Only entries by this actor.
    pub user_id: Option<Uuid>,
    /// Only entries of this type.
    pub action_type: Option<AuditActionType>,
    /// Only entries scoped to this module.
    pub module_id: Option<Uuid>,
    /// Only entries at this risk level.
    pub risk_level: Option<RiskLevel>,
    /// Only entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only entries before this instant.
    pub until: Option<DateTime<Utc>>,
}
