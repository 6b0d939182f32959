//! Staff role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles assigned to staff accounts.
///
/// The user record itself lives outside this engine; the role travels with
/// the authenticated subject on every check. Roles are ordered by privilege
/// level: SuperAdmin > Developer > Admin > Manager > Cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Platform owner account with unrestricted access.
    SuperAdmin,
    /// Engineering break-glass account.
    Developer,
    /// Store administrator.
    Admin,
    /// Shift or floor manager.
    Manager,
    /// Till operator.
    Cashier,
}

impl StaffRole {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::SuperAdmin => 5,
            Self::Developer => 4,
            Self::Admin => 3,
            Self::Manager => 2,
            Self::Cashier => 1,
        }
    }

    /// Check if this role has at least the given role's privileges.
    pub fn has_at_least(&self, other: &StaffRole) -> bool {
        self.privilege_level() >= other.privilege_level()
    }

    /// Whether this role is in the elevated set that bypasses policy
    /// resolution entirely. The bypass is operational break-glass access
    /// and is immune to group and individual overrides.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Developer | Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Developer => "developer",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Cashier => "cashier",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = tillpoint_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "super_admin" => Ok(Self::SuperAdmin),
            "developer" => Ok(Self::Developer),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "cashier" => Ok(Self::Cashier),
            _ => Err(tillpoint_core::AppError::validation(format!(
                "Invalid staff role: '{s}'. Expected one of: super_admin, developer, admin, manager, cashier"
            ))),
        }
    }
}
