//! Policy engine configuration.

use serde::{Deserialize, Serialize};

/// Settings for the permission resolution engine and audit pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Capacity of the bounded audit write queue. Entries beyond this are
    /// dropped (and reported to the operational log) rather than blocking
    /// permission checks.
    #[serde(default = "default_audit_queue_capacity")]
    pub audit_queue_capacity: usize,
    /// Whether the provision run purges expired individual permissions.
    #[serde(default)]
    pub purge_expired_on_provision: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            audit_queue_capacity: default_audit_queue_capacity(),
            purge_expired_on_provision: false,
        }
    }
}

fn default_audit_queue_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PolicyConfig::default();
        assert_eq!(config.audit_queue_capacity, 1024);
        assert!(!config.purge_expired_on_provision);
    }
}
