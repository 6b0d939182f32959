//! The pure resolution core.
//!
//! Combines role bypass, individual overrides, group grants, and condition
//! evaluation into a [`Decision`]. First decisive answer wins, in this
//! exact order:
//!
//! 1. Role bypass for the elevated set, immune to any override.
//! 2. Individual override (non-expired): a deny row denies outright; an
//!    allow row applies its conditions and then its granted flag.
//! 3. Group grants from effective memberships: any granting row whose
//!    conditions pass wins. Group rows never veto each other.
//! 4. Default deny.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tillpoint_entity::permission::PermissionType;
use tillpoint_entity::user::StaffRole;

use crate::conditions::{self, ConditionContext, ConditionFailure};
use crate::snapshot::UserPermissionSet;

/// Which resolution rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// The subject's role is in the elevated break-glass set.
    RoleBypass,
    /// An individual allow override granted the capability.
    IndividualAllow,
    /// An individual deny override rejected the capability.
    IndividualDeny,
    /// An individual allow override exists but its granted flag is off.
    IndividualRevoked,
    /// An individual override's conditions rejected the check.
    IndividualConditionFailed,
    /// A group grant allowed the capability.
    GroupGrant,
    /// Group rows exist for the capability but every granting row's
    /// conditions rejected the check.
    GroupConditionFailed,
    /// Group rows exist but none of them grants.
    GroupWithheld,
    /// No row matched anywhere.
    DefaultDeny,
    /// The check had no authenticated subject.
    MissingSubject,
    /// Storage could not be read; the check fails closed.
    StorageFailure,
}

impl DecisionRule {
    /// Return the rule as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleBypass => "role_bypass",
            Self::IndividualAllow => "individual_allow",
            Self::IndividualDeny => "individual_deny",
            Self::IndividualRevoked => "individual_revoked",
            Self::IndividualConditionFailed => "individual_condition_failed",
            Self::GroupGrant => "group_grant",
            Self::GroupConditionFailed => "group_condition_failed",
            Self::GroupWithheld => "group_withheld",
            Self::DefaultDeny => "default_deny",
            Self::MissingSubject => "missing_subject",
            Self::StorageFailure => "storage_failure",
        }
    }
}

/// The outcome of one resolution, with the reasoning trail the audit log
/// records for administrators.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Whether access is granted.
    pub granted: bool,
    /// The rule that fired.
    pub rule: DecisionRule,
    /// The group whose grant fired, when the rule is a group rule.
    pub source_group: Option<String>,
    /// The condition that rejected the check, when one did.
    pub condition_failure: Option<ConditionFailure>,
}

impl Decision {
    /// A granting decision.
    pub fn grant(rule: DecisionRule) -> Self {
        Self {
            granted: true,
            rule,
            source_group: None,
            condition_failure: None,
        }
    }

    /// A denying decision.
    pub fn deny(rule: DecisionRule) -> Self {
        Self {
            granted: false,
            rule,
            source_group: None,
            condition_failure: None,
        }
    }

    /// A denying decision caused by a failed condition.
    pub fn deny_condition(rule: DecisionRule, failure: ConditionFailure) -> Self {
        Self {
            granted: false,
            rule,
            source_group: None,
            condition_failure: Some(failure),
        }
    }
}

/// Resolve one capability check against a loaded permission snapshot.
pub fn resolve(
    role: StaffRole,
    permissions: &UserPermissionSet,
    capability: &str,
    ctx: &ConditionContext,
    now: DateTime<Utc>,
) -> Decision {
    // 1. Role bypass. Operational accounts are never locked out by a
    // misconfigured policy, so this runs before any stored row.
    if role.is_elevated() {
        return Decision::grant(DecisionRule::RoleBypass);
    }

    // 2. Individual override. Expired rows are inert.
    if let Some(grant) = permissions.individual(capability) {
        if !grant.is_expired_at(now) {
            if grant.permission_type == PermissionType::Deny {
                return Decision::deny(DecisionRule::IndividualDeny);
            }
            if let Some(conditions) = &grant.conditions {
                if let Err(failure) = conditions::evaluate(conditions, ctx) {
                    return Decision::deny_condition(
                        DecisionRule::IndividualConditionFailed,
                        failure,
                    );
                }
            }
            return if grant.is_granted {
                Decision::grant(DecisionRule::IndividualAllow)
            } else {
                Decision::deny(DecisionRule::IndividualRevoked)
            };
        }
    }

    // 3. Group grants: any granting row whose conditions pass wins.
    let rows = permissions.group_rows(capability);
    let mut last_failure = None;
    for row in rows {
        if !row.is_granted {
            continue;
        }
        match row.conditions.as_ref() {
            Some(conditions) => match conditions::evaluate(conditions, ctx) {
                Ok(()) => {
                    let mut decision = Decision::grant(DecisionRule::GroupGrant);
                    decision.source_group = Some(row.group_name.clone());
                    return decision;
                }
                Err(failure) => last_failure = Some(failure),
            },
            None => {
                let mut decision = Decision::grant(DecisionRule::GroupGrant);
                decision.source_group = Some(row.group_name.clone());
                return decision;
            }
        }
    }

    if let Some(failure) = last_failure {
        return Decision::deny_condition(DecisionRule::GroupConditionFailed, failure);
    }
    if !rows.is_empty() {
        return Decision::deny(DecisionRule::GroupWithheld);
    }

    // 4. Default deny.
    Decision::deny(DecisionRule::DefaultDeny)
}
