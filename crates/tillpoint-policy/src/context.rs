//! Request context carrying the authenticated subject and the ambient
//! facts condition evaluation needs.

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tillpoint_entity::user::StaffRole;

use crate::conditions::ConditionContext;

/// The authenticated subject of a permission check.
///
/// The user record itself lives outside the engine; the role travels with
/// the subject as resolved by the session layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Subject {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// The user's role at the time the session was established.
    pub role: StaffRole,
}

impl Subject {
    /// Create a new subject.
    pub fn new(user_id: Uuid, role: StaffRole) -> Self {
        Self { user_id, role }
    }
}

/// Context for the current request.
///
/// Extracted by the request layer and handed to the engine at
/// construction, so every check knows *where* and *when* it happens and
/// every audit entry carries the session facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckContext {
    /// The current session ID.
    pub session_id: Option<Uuid>,
    /// IP address of the request origin.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// The operating location (till/store) the subject is working from.
    pub location_id: Option<Uuid>,
    /// When the request was received, in server local time. Time-window
    /// conditions are evaluated against this instant.
    pub request_time: DateTime<Local>,
}

impl CheckContext {
    /// Create a context stamped with the current local time.
    pub fn new() -> Self {
        Self {
            session_id: None,
            ip_address: None,
            user_agent: None,
            location_id: None,
            request_time: Local::now(),
        }
    }

    /// Set the session ID.
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Set the origin IP address.
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Set the User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the operating location.
    pub fn with_location(mut self, location_id: Uuid) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Override the request instant (tests, replay).
    pub fn with_request_time(mut self, request_time: DateTime<Local>) -> Self {
        self.request_time = request_time;
        self
    }

    /// The local hour-of-day of the request.
    pub fn local_hour(&self) -> u32 {
        self.request_time.hour()
    }

    /// Build the condition-evaluation context for one check.
    pub fn condition_context(&self, resource: Option<&ResourceRef>) -> ConditionContext {
        ConditionContext {
            local_hour: self.local_hour(),
            location_id: self.location_id,
            resource_amount_minor: resource.and_then(|r| r.amount_minor),
        }
    }
}

impl Default for CheckContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to the resource a check targets, for amount-gated grants.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceRef {
    /// The target resource's ID, when there is one.
    pub resource_id: Option<Uuid>,
    /// The amount derived from the resource, in minor currency units.
    pub amount_minor: Option<i64>,
}

impl ResourceRef {
    /// Reference a resource by ID.
    pub fn id(resource_id: Uuid) -> Self {
        Self {
            resource_id: Some(resource_id),
            amount_minor: None,
        }
    }

    /// Reference an amount with no stored resource (e.g. an in-flight sale).
    pub fn amount(amount_minor: i64) -> Self {
        Self {
            resource_id: None,
            amount_minor: Some(amount_minor),
        }
    }

    /// Attach an amount to the reference.
    pub fn with_amount(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }
}
