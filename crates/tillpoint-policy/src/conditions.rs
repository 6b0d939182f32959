//! Grant condition evaluation.
//!
//! A pure, total function over the condition payload and the facts of the
//! current check. Each sub-condition present must independently pass; the
//! failure variant names which one did not, for the audit reasoning trail.

use serde::Serialize;
use uuid::Uuid;

use tillpoint_entity::permission::PermissionConditions;

/// The facts a condition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext {
    /// Hour-of-day of the request in server local time (0-23).
    pub local_hour: u32,
    /// The subject's current operating location.
    pub location_id: Option<Uuid>,
    /// The amount derived from the target resource, in minor units.
    pub resource_amount_minor: Option<i64>,
}

/// Which sub-condition rejected the grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionFailure {
    /// The request hour is outside the grant's time window.
    OutsideTimeWindow,
    /// The current location is missing or not in the allow-list.
    LocationNotAllowed,
    /// The grant is amount-gated but the check supplied no resource
    /// amount. Fails closed: an unverifiable ceiling cannot grant.
    MissingResourceAmount,
    /// The resource amount exceeds the configured ceiling.
    AmountLimitExceeded,
}

impl ConditionFailure {
    /// Return the failure as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutsideTimeWindow => "outside_time_window",
            Self::LocationNotAllowed => "location_not_allowed",
            Self::MissingResourceAmount => "missing_resource_amount",
            Self::AmountLimitExceeded => "amount_limit_exceeded",
        }
    }
}

impl std::fmt::Display for ConditionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Evaluate a grant's conditions against the current check.
///
/// No conditions present passes trivially.
pub fn evaluate(
    conditions: &PermissionConditions,
    ctx: &ConditionContext,
) -> Result<(), ConditionFailure> {
    if let Some(window) = &conditions.time {
        if !window.contains(ctx.local_hour) {
            return Err(ConditionFailure::OutsideTimeWindow);
        }
    }

    if let Some(allowed) = &conditions.locations {
        match ctx.location_id {
            Some(location) if allowed.contains(&location) => {}
            _ => return Err(ConditionFailure::LocationNotAllowed),
        }
    }

    if let Some(limit) = conditions.amount_limit_minor {
        match ctx.resource_amount_minor {
            None => return Err(ConditionFailure::MissingResourceAmount),
            Some(amount) if amount > limit => {
                return Err(ConditionFailure::AmountLimitExceeded);
            }
            Some(_) => {}
        }
    }

    Ok(())
}
