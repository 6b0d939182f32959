//! User group membership entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Links a user to a permission group, with an activation window.
///
/// A membership contributes grants only while `is_active` is true and the
/// expiry (if any) is in the future. Removal is a soft deactivation so the
/// assignment history stays reviewable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserGroupMembership {
    /// Unique membership identifier.
    pub id: Uuid,
    /// The member user.
    pub user_id: Uuid,
    /// The group joined.
    pub group_id: Uuid,
    /// Admin who assigned the membership.
    pub assigned_by: Uuid,
    /// When the membership was assigned (or last re-activated).
    pub assigned_at: DateTime<Utc>,
    /// When the membership lapses (None = permanent).
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the membership is active (soft removal flag).
    pub is_active: bool,
}

impl UserGroupMembership {
    /// Whether the membership currently contributes grants.
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn membership(is_active: bool, expires_at: Option<DateTime<Utc>>) -> UserGroupMembership {
        UserGroupMembership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            assigned_by: Uuid::new_v4(),
            assigned_at: Utc::now(),
            expires_at,
            is_active,
        }
    }

    #[test]
    fn test_effective_permanent() {
        assert!(membership(true, None).is_effective_at(Utc::now()));
    }

    #[test]
    fn test_soft_removed_not_effective() {
        assert!(!membership(false, None).is_effective_at(Utc::now()));
    }

    #[test]
    fn test_expired_not_effective() {
        let now = Utc::now();
        assert!(!membership(true, Some(now - Duration::hours(1))).is_effective_at(now));
        assert!(membership(true, Some(now + Duration::hours(1))).is_effective_at(now));
    }
}
