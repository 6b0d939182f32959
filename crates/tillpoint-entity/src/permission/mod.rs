//! Permission grant domain entities: conditions, individual overrides, and
//! the effective-grant projections consumed by the resolution engine.

pub mod conditions;
pub mod effective;
pub mod individual;

pub use conditions::{PermissionConditions, TimeWindow};
pub use effective::{GroupGrant, IndividualGrant};
pub use individual::{IndividualPermission, PermissionType};
