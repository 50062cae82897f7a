//! Built-in dynamic variables
//!
//! Names start with `$` and produce a fresh value each time a resolver
//! session first meets them.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

/// Generates values for built-in dynamic variables.
pub struct BuiltinVariables;

impl BuiltinVariables {
    /// Resolves a built-in variable name to a newly generated value.
    /// Returns `None` if the name is not a recognized built-in.
    #[must_use]
    pub fn resolve(name: &str) -> Option<String> {
        match name {
            "$guid" | "$uuid" | "$randomUUID" => Some(Uuid::new_v4().to_string()),
            "$timestamp" => Some(Utc::now().timestamp().to_string()),
            "$isoTimestamp" => Some(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            "$randomInt" => Some(rand::rng().random_range(0..=1000).to_string()),
            _ => None,
        }
    }

    /// Returns whether the name is a recognized built-in.
    #[must_use]
    pub fn is_builtin(name: &str) -> bool {
        matches!(
            name,
            "$guid" | "$uuid" | "$randomUUID" | "$timestamp" | "$isoTimestamp" | "$randomInt"
        )
    }
}
