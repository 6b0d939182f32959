//! Module-action edge entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Declares that an action is applicable to a module.
///
/// At most one edge exists per (module, action) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModuleActionEdge {
    /// Unique edge identifier.
    pub id: Uuid,
    /// The module this edge belongs to.
    pub module_id: Uuid,
    /// The action applicable to the module.
    pub action_id: Uuid,
    /// Whether newly provisioned roles receive this capability by default.
    pub is_default: bool,
}

/// Catalog lookup projection for one (module, action) capability.
///
/// Joined from `pos_modules`, `pos_actions`, and `module_actions`; used by
/// the engine for audit tagging and by the mutation API to validate keys.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModuleActionMeta {
    /// The module identifier.
    pub module_id: Uuid,
    /// The action identifier.
    pub action_id: Uuid,
    /// The module key.
    pub module_key: String,
    /// The action key.
    pub action_key: String,
    /// Whether the action is sensitive.
    pub is_sensitive: bool,
    /// Whether the action requires approval.
    pub requires_approval: bool,
    /// Whether the capability is part of the default provision set.
    pub is_default: bool,
}
