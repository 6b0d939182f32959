//! Built-in permission catalog definition and the idempotent seeder.
//!
//! Provisioning runs once per deployment and is safe to re-run: the
//! upserts insert missing rows and refresh the seed-owned fields without
//! touching manually edited active flags.

use tracing::info;

use tillpoint_core::result::AppResult;
use tillpoint_database::repositories::CatalogRepository;

/// One action in the built-in catalog.
struct ActionSeed {
    key: &'static str,
    display_name: &'static str,
    description: &'static str,
    is_sensitive: bool,
    requires_approval: bool,
}

/// One module in the built-in catalog, with its applicable actions and
/// whether each is part of the default provision set.
struct ModuleSeed {
    key: &'static str,
    display_name: &'static str,
    description: &'static str,
    icon: &'static str,
    sort_order: i32,
    /// (action key, is_default)
    actions: &'static [(&'static str, bool)],
}

const ACTIONS: &[ActionSeed] = &[
    ActionSeed {
        key: "view",
        display_name: "View",
        description: "View records and dashboards",
        is_sensitive: false,
        requires_approval: false,
    },
    ActionSeed {
        key: "create",
        display_name: "Create",
        description: "Create new records",
        is_sensitive: false,
        requires_approval: false,
    },
    ActionSeed {
        key: "update",
        display_name: "Update",
        description: "Edit existing records",
        is_sensitive: false,
        requires_approval: false,
    },
    ActionSeed {
        key: "delete",
        display_name: "Delete",
        description: "Delete records",
        is_sensitive: true,
        requires_approval: false,
    },
    ActionSeed {
        key: "export",
        display_name: "Export",
        description: "Export data out of the platform",
        is_sensitive: false,
        requires_approval: false,
    },
    ActionSeed {
        key: "refund",
        display_name: "Refund",
        description: "Refund a completed sale",
        is_sensitive: true,
        requires_approval: true,
    },
    ActionSeed {
        key: "void",
        display_name: "Void",
        description: "Void a sale or order",
        is_sensitive: true,
        requires_approval: true,
    },
    ActionSeed {
        key: "discount",
        display_name: "Discount",
        description: "Apply manual discounts",
        is_sensitive: true,
        requires_approval: false,
    },
    ActionSeed {
        key: "manage",
        display_name: "Manage",
        description: "Administer settings and permissions",
        is_sensitive: true,
        requires_approval: false,
    },
];

const MODULES: &[ModuleSeed] = &[
    ModuleSeed {
        key: "sales",
        display_name: "Sales",
        description: "Till sales and payments",
        icon: "cash-register",
        sort_order: 1,
        actions: &[
            ("view", true),
            ("create", true),
            ("refund", false),
            ("void", false),
            ("discount", false),
            ("export", false),
        ],
    },
    ModuleSeed {
        key: "orders",
        display_name: "Orders",
        description: "Table and takeaway orders",
        icon: "receipt",
        sort_order: 2,
        actions: &[
            ("view", true),
            ("create", true),
            ("update", true),
            ("void", false),
        ],
    },
    ModuleSeed {
        key: "products",
        display_name: "Products",
        description: "Product and menu management",
        icon: "tag",
        sort_order: 3,
        actions: &[
            ("view", true),
            ("create", false),
            ("update", false),
            ("delete", false),
        ],
    },
    ModuleSeed {
        key: "inventory",
        display_name: "Inventory",
        description: "Stock levels and adjustments",
        icon: "boxes",
        sort_order: 4,
        actions: &[("view", true), ("update", false), ("export", false)],
    },
    ModuleSeed {
        key: "customers",
        display_name: "Customers",
        description: "Customer accounts and loyalty",
        icon: "users",
        sort_order: 5,
        actions: &[
            ("view", true),
            ("create", true),
            ("update", false),
            ("delete", false),
            ("export", false),
        ],
    },
    ModuleSeed {
        key: "reports",
        display_name: "Reports",
        description: "Sales and inventory reporting",
        icon: "chart-bar",
        sort_order: 6,
        actions: &[("view", false), ("export", false)],
    },
    ModuleSeed {
        key: "staff",
        display_name: "Staff",
        description: "Staff accounts, shifts, and permissions",
        icon: "id-badge",
        sort_order: 7,
        actions: &[
            ("view", false),
            ("create", false),
            ("update", false),
            ("delete", false),
            ("manage", false),
        ],
    },
    ModuleSeed {
        key: "settings",
        display_name: "Settings",
        description: "Store and platform configuration",
        icon: "cog",
        sort_order: 8,
        actions: &[("view", false), ("update", false), ("manage", false)],
    },
];

/// Summary of one provisioning run.
#[derive(Debug, Clone, Copy)]
pub struct SeedSummary {
    /// Modules upserted.
    pub modules: usize,
    /// Actions upserted.
    pub actions: usize,
    /// Module-action edges upserted.
    pub edges: usize,
}

/// Provisions the built-in catalog.
#[derive(Debug, Clone)]
pub struct CatalogSeeder {
    catalog: CatalogRepository,
}

impl CatalogSeeder {
    /// Create a seeder over the catalog repository.
    pub fn new(catalog: CatalogRepository) -> Self {
        Self { catalog }
    }

    /// Upsert the built-in modules, actions, and edges.
    pub async fn seed(&self) -> AppResult<SeedSummary> {
        let mut action_ids = std::collections::HashMap::new();
        for action in ACTIONS {
            let row = self
                .catalog
                .upsert_action(
                    action.key,
                    action.display_name,
                    Some(action.description),
                    action.is_sensitive,
                    action.requires_approval,
                )
                .await?;
            action_ids.insert(action.key, row.id);
        }

        let mut edges = 0;
        for module in MODULES {
            let row = self
                .catalog
                .upsert_module(
                    module.key,
                    module.display_name,
                    Some(module.description),
                    Some(module.icon),
                    module.sort_order,
                )
                .await?;

            for (action_key, is_default) in module.actions {
                // The seed tables are static; a dangling action key here is
                // a defect in this file.
                let action_id = action_ids[action_key];
                self.catalog
                    .upsert_module_action(row.id, action_id, *is_default)
                    .await?;
                edges += 1;
            }
        }

        let summary = SeedSummary {
            modules: MODULES.len(),
            actions: ACTIONS.len(),
            edges,
        };
        info!(
            modules = summary.modules,
            actions = summary.actions,
            edges = summary.edges,
            "Permission catalog provisioned"
        );
        Ok(summary)
    }
}
