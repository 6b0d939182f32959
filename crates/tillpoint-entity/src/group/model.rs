//! Permission group entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A named bundle of grants assignable to users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PermissionGroup {
    /// Unique group identifier.
    pub id: Uuid,
    /// Unique group name.
    pub name: String,
    /// Description of the group's purpose.
    pub description: Option<String>,
    /// UI color hint for the admin grid.
    pub color: Option<String>,
    /// Whether the group is active. Inactive groups contribute no grants.
    pub is_active: bool,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}
