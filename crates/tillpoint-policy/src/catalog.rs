//! In-memory index over the permission catalog.
//!
//! The catalog is static-ish (provisioned at seed time, read-heavy), so
//! the engine loads it once per instance and indexes it for key lookups
//! and for rendering the permission matrix.

use std::collections::HashMap;

use uuid::Uuid;

use tillpoint_core::types::keys::{ActionKey, ModuleKey};
use tillpoint_entity::catalog::{ModuleActionEdge, ModuleActionMeta, PosAction, PosModule};

/// Raw catalog rows as loaded from the store.
#[derive(Debug, Clone, Default)]
pub struct CatalogData {
    /// All modules, active or not.
    pub modules: Vec<PosModule>,
    /// All actions.
    pub actions: Vec<PosAction>,
    /// All module-action edges.
    pub edges: Vec<ModuleActionEdge>,
}

/// Indexed catalog view.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    /// Active modules in display order.
    modules: Vec<PosModule>,
    /// Capability metadata keyed by (module key, action key).
    capabilities: HashMap<(String, String), ModuleActionMeta>,
    /// Applicable actions per module, in key order.
    actions_by_module: HashMap<Uuid, Vec<PosAction>>,
}

impl CatalogIndex {
    /// Build the index from raw catalog rows.
    pub fn build(data: CatalogData) -> Self {
        let module_by_id: HashMap<Uuid, &PosModule> =
            data.modules.iter().map(|m| (m.id, m)).collect();
        let action_by_id: HashMap<Uuid, &PosAction> =
            data.actions.iter().map(|a| (a.id, a)).collect();

        let mut capabilities = HashMap::with_capacity(data.edges.len());
        let mut actions_by_module: HashMap<Uuid, Vec<PosAction>> = HashMap::new();

        for edge in &data.edges {
            let (Some(module), Some(action)) = (
                module_by_id.get(&edge.module_id),
                action_by_id.get(&edge.action_id),
            ) else {
                // Dangling edge; the foreign keys make this unreachable in
                // practice but the index must stay total.
                continue;
            };

            capabilities.insert(
                (module.key.clone(), action.key.clone()),
                ModuleActionMeta {
                    module_id: module.id,
                    action_id: action.id,
                    module_key: module.key.clone(),
                    action_key: action.key.clone(),
                    is_sensitive: action.is_sensitive,
                    requires_approval: action.requires_approval,
                    is_default: edge.is_default,
                },
            );
            actions_by_module
                .entry(module.id)
                .or_default()
                .push((*action).clone());
        }

        for actions in actions_by_module.values_mut() {
            actions.sort_by(|a, b| a.key.cmp(&b.key));
        }

        let mut modules: Vec<PosModule> = data
            .modules
            .into_iter()
            .filter(|m| m.is_active)
            .collect();
        modules.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.key.cmp(&b.key)));

        Self {
            modules,
            capabilities,
            actions_by_module,
        }
    }

    /// Look up one capability by typed keys.
    pub fn capability(&self, module: &ModuleKey, action: &ActionKey) -> Option<&ModuleActionMeta> {
        self.capabilities
            .get(&(module.as_str().to_string(), action.as_str().to_string()))
    }

    /// Active modules in display order.
    pub fn modules(&self) -> &[PosModule] {
        &self.modules
    }

    /// The actions applicable to a module, in key order.
    pub fn actions_for_module(&self, module_id: Uuid) -> &[PosAction] {
        self.actions_by_module
            .get(&module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
