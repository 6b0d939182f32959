//! # tillpoint-entity
//!
//! Domain entity models for the Tillpoint permission engine: the permission
//! catalog (modules, actions, module-action edges), permission groups and
//! memberships, individual overrides, grant conditions, staff roles, and
//! the audit log.

pub mod audit;
pub mod catalog;
pub mod group;
pub mod permission;
pub mod user;

pub use audit::{AuditActionType, AuditLogEntry, AuditLogFilter, CreateAuditLogEntry, RiskLevel};
pub use catalog::{ModuleActionEdge, ModuleActionMeta, PosAction, PosModule};
pub use group::{GroupPermission, PermissionGroup, UserGroupMembership};
pub use permission::{
    GroupGrant, IndividualGrant, IndividualPermission, PermissionConditions, PermissionType,
    TimeWindow,
};
pub use user::StaffRole;
