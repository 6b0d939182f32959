//! # tillpoint-policy
//!
//! The Tillpoint permission resolution and policy engine.
//!
//! ## Modules
//!
//! - `engine` — request-scoped permission resolution (`has_permission`,
//!   `require_permission`, the permission matrix projection)
//! - `decision` — the pure resolution core (role bypass, individual
//!   overrides, group grants, default deny)
//! - `conditions` — evaluation of time/location/amount grant constraints
//! - `snapshot` — the per-user permission snapshot and its cache
//! - `admin` — the administrative mutation API (grant, revoke, deny,
//!   group and membership changes)
//! - `audit` — the fire-and-forget audit recorder and risk tagging
//! - `store` — storage and audit ports plus the Postgres adapter
//! - `seed` — the built-in catalog definition and idempotent seeder

pub mod admin;
pub mod audit;
pub mod catalog;
pub mod conditions;
pub mod context;
pub mod decision;
pub mod engine;
pub mod matrix;
pub mod seed;
pub mod snapshot;
pub mod store;

pub use admin::{GrantOptions, PermissionAdmin};
pub use audit::AuditRecorder;
pub use catalog::{CatalogData, CatalogIndex};
pub use conditions::{ConditionContext, ConditionFailure};
pub use context::{CheckContext, ResourceRef, Subject};
pub use decision::{Decision, DecisionRule};
pub use engine::PolicyEngine;
pub use matrix::{MatrixAction, MatrixModule, PermissionMatrix};
pub use seed::CatalogSeeder;
pub use snapshot::{SnapshotCache, UserPermissionSet};
pub use store::{AuditSink, IndividualUpsert, PgPolicyStore, PolicyStore};
