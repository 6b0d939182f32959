//! Permission matrix projection for the administrative grant/revoke grid.

use serde::{Deserialize, Serialize};

/// One action cell in the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixAction {
    /// The action key.
    pub key: String,
    /// Display name for the grid.
    pub display_name: String,
    /// Whether the action is sensitive.
    pub is_sensitive: bool,
    /// Whether the action requires a supervisor approval flow.
    pub requires_approval: bool,
    /// Whether the projected subject holds this capability.
    pub has_permission: bool,
}

/// One module row in the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixModule {
    /// The module key.
    pub key: String,
    /// Display name for the grid.
    pub display_name: String,
    /// UI icon hint.
    pub icon: Option<String>,
    /// The module's applicable actions.
    pub actions: Vec<MatrixAction>,
}

/// The full projection: active modules in display order, each with its
/// applicable actions and the subject's resolved access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionMatrix {
    /// Module rows.
    pub modules: Vec<MatrixModule>,
}
