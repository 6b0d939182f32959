//! Validated newtype wrappers for permission catalog identifiers.
//!
//! Module and action keys are interned identifiers, not free-form strings:
//! construction validates the slug format so that a typo fails at the
//! boundary instead of silently resolving to "no such permission" at
//! check time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Maximum length of a module or action key.
const MAX_KEY_LEN: usize = 64;

/// Validate a catalog key slug: non-empty, bounded, `[a-z0-9_]` only.
fn validate_key(kind: &str, s: &str) -> Result<(), AppError> {
    if s.is_empty() {
        return Err(AppError::validation(format!("{kind} key must not be empty")));
    }
    if s.len() > MAX_KEY_LEN {
        return Err(AppError::validation(format!(
            "{kind} key '{s}' exceeds {MAX_KEY_LEN} characters"
        )));
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
    {
        return Err(AppError::validation(format!(
            "{kind} key '{s}' must contain only lowercase letters, digits, and underscores"
        )));
    }
    Ok(())
}

/// Macro to define a validated key newtype.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a validated key from a string.
            pub fn new(key: impl Into<String>) -> Result<Self, AppError> {
                let key = key.into();
                validate_key($kind, &key)?;
                Ok(Self(key))
            }

            /// Return the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the key and return the inner string.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(
    /// The unique key of a business capability module (e.g. `"sales"`).
    ModuleKey,
    "module"
);

define_key!(
    /// The unique key of an action verb (e.g. `"refund"`).
    ActionKey,
    "action"
);

/// Build the `"module:action"` capability key used by the per-user
/// permission snapshot.
pub fn capability_key(module: &ModuleKey, action: &ActionKey) -> String {
    format!("{}:{}", module.as_str(), action.as_str())
}
