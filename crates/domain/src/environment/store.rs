//! Layered variable store.
//!
//! Two scopes live side by side: the durable *environment* scope and the
//! *temporary* scope written by scripts and seeded from iteration data.
//! Lookups consult the temporary scope first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered name to value mapping.
pub type VariableMap = BTreeMap<String, String>;

/// The scope a variable was read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    /// Durable, user-configured values shared across requests and iterations.
    Environment,
    /// Script-set and data-seeded values, wiped before each iteration.
    Temporary,
    /// Dynamic values such as `$uuid` generated at resolution time.
    Builtin,
}

impl VariableScope {
    /// Human-readable scope name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Temporary => "temporary",
            Self::Builtin => "builtin",
        }
    }
}

/// A variable value together with the scope it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariable {
    /// Variable name.
    pub name: String,
    /// Resolved value.
    pub value: String,
    /// Scope the value came from.
    pub scope: VariableScope,
}

/// The two concurrent variable scopes of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableStore {
    environment: VariableMap,
    #[serde(skip)]
    temporary: VariableMap,
}

impl VariableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose environment scope holds `environment`.
    #[must_use]
    pub fn with_environment(environment: VariableMap) -> Self {
        Self {
            environment,
            temporary: VariableMap::new(),
        }
    }

    /// Look up a value, temporary scope first.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.temporary
            .get(name)
            .or_else(|| self.environment.get(name))
            .map(String::as_str)
    }

    /// Look up a value and report the scope that supplied it.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ResolvedVariable> {
        let (value, scope) = if let Some(value) = self.temporary.get(name) {
            (value, VariableScope::Temporary)
        } else {
            (self.environment.get(name)?, VariableScope::Environment)
        };
        Some(ResolvedVariable {
            name: name.to_string(),
            value: value.clone(),
            scope,
        })
    }

    /// Look up a value in one scope only.
    #[must_use]
    pub fn get_in(&self, scope: VariableScope, name: &str) -> Option<&str> {
        self.scope(scope)?.get(name).map(String::as_str)
    }

    /// Write a value into a scope. Writes to the builtin scope are ignored.
    pub fn set(&mut self, scope: VariableScope, name: impl Into<String>, value: impl Into<String>) {
        if let Some(map) = self.scope_mut(scope) {
            map.insert(name.into(), value.into());
        }
    }

    /// Remove a value from a scope, returning the previous value.
    pub fn unset(&mut self, scope: VariableScope, name: &str) -> Option<String> {
        self.scope_mut(scope)?.remove(name)
    }

    /// Wipe the temporary scope.
    pub fn clear(&mut self) {
        self.temporary.clear();
    }

    /// Replace the temporary scope with one row of iteration data.
    pub fn seed_temporary(&mut self, row: &VariableMap) {
        self.temporary.clone_from(row);
    }

    /// The environment scope.
    #[must_use]
    pub const fn environment(&self) -> &VariableMap {
        &self.environment
    }

    /// The temporary scope.
    #[must_use]
    pub const fn temporary(&self) -> &VariableMap {
        &self.temporary
    }

    /// Snapshot of every visible variable with temporary values overriding.
    #[must_use]
    pub fn merged(&self) -> VariableMap {
        let mut merged = self.environment.clone();
        merged.extend(self.temporary.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    const fn scope(&self, scope: VariableScope) -> Option<&VariableMap> {
        match scope {
            VariableScope::Environment => Some(&self.environment),
            VariableScope::Temporary => Some(&self.temporary),
            VariableScope::Builtin => None,
        }
    }

    const fn scope_mut(&mut self, scope: VariableScope) -> Option<&mut VariableMap> {
        match scope {
            VariableScope::Environment => Some(&mut self.environment),
            VariableScope::Temporary => Some(&mut self.temporary),
            VariableScope::Builtin => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> VariableStore {
        let mut env = VariableMap::new();
        env.insert("host".to_string(), "api.example.com".to_string());
        env.insert("token".to_string(), "env-token".to_string());
        VariableStore::with_environment(env)
    }

    #[test]
    fn test_temporary_overrides_environment() {
        let mut store = store();
        assert_eq!(store.get("token"), Some("env-token"));

        store.set(VariableScope::Temporary, "token", "tmp-token");
        assert_eq!(store.get("token"), Some("tmp-token"));
        assert_eq!(
            store.resolve("token").unwrap().scope,
            VariableScope::Temporary
        );
        assert_eq!(
            store.get_in(VariableScope::Environment, "token"),
            Some("env-token")
        );
    }

    #[test]
    fn test_clear_only_touches_temporary() {
        let mut store = store();
        store.set(VariableScope::Temporary, "id", "7");
        store.clear();

        assert_eq!(store.get("id"), None);
        assert_eq!(store.get("host"), Some("api.example.com"));
    }

    #[test]
    fn test_seed_replaces_previous_row() {
        let mut store = store();
        let row1: VariableMap = [("user".to_string(), "alice".to_string())].into();
        let row2: VariableMap = [("user".to_string(), "bob".to_string())].into();

        store.seed_temporary(&row1);
        store.set(VariableScope::Temporary, "extra", "leftover");
        store.seed_temporary(&row2);

        assert_eq!(store.get("user"), Some("bob"));
        assert_eq!(store.get("extra"), None);
    }

    #[test]
    fn test_unset_and_builtin_scope() {
        let mut store = store();
        assert_eq!(
            store.unset(VariableScope::Environment, "token"),
            Some("env-token".to_string())
        );
        assert_eq!(store.get("token"), None);

        store.set(VariableScope::Builtin, "$uuid", "x");
        assert_eq!(store.get("$uuid"), None);
    }

    #[test]
    fn test_merged_view() {
        let mut store = store();
        store.set(VariableScope::Temporary, "host", "localhost");
        let merged = store.merged();
        assert_eq!(merged.get("host").map(String::as_str), Some("localhost"));
        assert_eq!(merged.len(), 2);
    }
}
