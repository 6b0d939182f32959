//! Audit log domain entities.

pub mod model;

pub use model::{AuditActionType, AuditLogEntry, AuditLogFilter, CreateAuditLogEntry, RiskLevel};
