//! Structured grant conditions.
//!
//! A grant may carry a small, closed set of constraint kinds. Each kind
//! present must independently pass for the grant to apply. The struct is
//! stored as JSONB alongside the grant row; a closed sum of optional
//! fields keeps evaluation total without an expression language.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hour-of-day window in server local time.
///
/// Either bound may be absent; an absent bound does not constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest hour (0-23, inclusive) the grant is valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u8>,
    /// Latest hour (0-23, inclusive) the grant is valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hour: Option<u8>,
}

impl TimeWindow {
    /// Whether the given local hour falls inside the window.
    pub fn contains(&self, hour: u32) -> bool {
        let after_start = self.start_hour.is_none_or(|s| hour >= u32::from(s));
        let before_end = self.end_hour.is_none_or(|e| hour <= u32::from(e));
        after_start && before_end
    }
}

/// Optional runtime constraints attached to a grant.
///
/// All present sub-conditions must pass (logical AND). No conditions
/// present means the grant applies unconditionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionConditions {
    /// Hour-of-day restriction, evaluated in server local time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeWindow>,
    /// Allowed operating location identifiers. The grant applies only when
    /// the subject's current location is in the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Uuid>>,
    /// Ceiling on the target resource's amount, in minor currency units.
    /// An amount-gated grant cannot be verified without a resource amount,
    /// so a missing amount fails closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_limit_minor: Option<i64>,
}

impl PermissionConditions {
    /// Whether no constraint is configured at all.
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.locations.is_none() && self.amount_limit_minor.is_none()
    }

    /// Convenience constructor for an hour-of-day window.
    pub fn time_window(start_hour: u8, end_hour: u8) -> Self {
        Self {
            time: Some(TimeWindow {
                start_hour: Some(start_hour),
                end_hour: Some(end_hour),
            }),
            ..Self::default()
        }
    }

    /// Convenience constructor for an amount ceiling.
    pub fn amount_limit(limit_minor: i64) -> Self {
        Self {
            amount_limit_minor: Some(limit_minor),
            ..Self::default()
        }
    }

    /// Convenience constructor for a location allow-list.
    pub fn locations(allowed: Vec<Uuid>) -> Self {
        Self {
            locations: Some(allowed),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_bounds() {
        let window = TimeWindow {
            start_hour: Some(9),
            end_hour: Some(17),
        };
        assert!(window.contains(9));
        assert!(window.contains(12));
        assert!(window.contains(17));
        assert!(!window.contains(8));
        assert!(!window.contains(20));
    }

    #[test]
    fn test_open_ended_window() {
        let from_nine = TimeWindow {
            start_hour: Some(9),
            end_hour: None,
        };
        assert!(from_nine.contains(23));
        assert!(!from_nine.contains(3));

        let until_five = TimeWindow {
            start_hour: None,
            end_hour: Some(17),
        };
        assert!(until_five.contains(0));
        assert!(!until_five.contains(18));
    }

    #[test]
    fn test_conditions_roundtrip() {
        let conditions = PermissionConditions {
            time: Some(TimeWindow {
                start_hour: Some(9),
                end_hour: Some(17),
            }),
            locations: Some(vec![Uuid::nil()]),
            amount_limit_minor: Some(100_000),
        };
        let json = serde_json::to_value(&conditions).unwrap();
        let back: PermissionConditions = serde_json::from_value(json).unwrap();
        assert_eq!(back, conditions);
    }

    #[test]
    fn test_empty_serializes_compact() {
        let json = serde_json::to_string(&PermissionConditions::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
