//! Action verb entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A verb applicable across modules (view, create, delete, refund, ...).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PosAction {
    /// Unique action identifier.
    pub id: Uuid,
    /// Unique action key (validated slug, e.g. `"refund"`).
    pub key: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Description of the verb.
    pub description: Option<String>,
    /// Whether this action is security-sensitive. Sensitive checks and
    /// grants are tagged with an elevated audit risk level.
    pub is_sensitive: bool,
    /// Whether performing this action requires a supervisor approval flow.
    pub requires_approval: bool,
    /// When the action was provisioned.
    pub created_at: DateTime<Utc>,
}
