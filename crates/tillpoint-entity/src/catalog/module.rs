//! Business capability module entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A business capability area gated by permissions (e.g. sales, inventory).
///
/// Modules are provisioned at seed time and read-heavy thereafter; they are
/// soft-deactivated rather than deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PosModule {
    /// Unique module identifier.
    pub id: Uuid,
    /// Unique module key (validated slug, e.g. `"sales"`).
    pub key: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Description of the capability area.
    pub description: Option<String>,
    /// UI icon hint.
    pub icon: Option<String>,
    /// Position in admin UI listings.
    pub sort_order: i32,
    /// Whether the module is active. Inactive modules stay in the catalog
    /// but are hidden from the permission matrix.
    pub is_active: bool,
    /// When the module was provisioned.
    pub created_at: DateTime<Utc>,
}
