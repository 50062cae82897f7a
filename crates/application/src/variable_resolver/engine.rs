//! Variable resolution engine
//!
//! Substitutes `{{variable}}` placeholders from a [`VariableStore`].

use std::collections::HashMap;

use courier_domain::environment::{ResolvedVariable, VariableScope, VariableStore};
use courier_domain::request::PreparedRequest;

use super::builtins::BuiltinVariables;
use super::parser::parse_variables;

/// Result of variable resolution for a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// The string with every resolvable placeholder substituted.
    pub resolved: String,

    /// Variables that were resolved.
    pub resolved_variables: Vec<ResolvedVariable>,

    /// Placeholder names left verbatim.
    pub unresolved: Vec<String>,
}

impl ResolutionResult {
    /// Creates a result for input with no placeholders.
    #[must_use]
    pub fn no_variables(input: &str) -> Self {
        Self {
            resolved: input.to_string(),
            resolved_variables: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    /// Whether every placeholder was resolved.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// One interpolation session over a store.
///
/// Built-ins are generated once per session, so `{{$uuid}}` appearing in
/// the URL and in a header of the same request yields the same value.
pub struct VariableResolver<'a> {
    store: &'a VariableStore,
    builtin_cache: HashMap<String, String>,
}

impl<'a> VariableResolver<'a> {
    /// Creates a resolver reading from `store`.
    #[must_use]
    pub fn new(store: &'a VariableStore) -> Self {
        Self {
            store,
            builtin_cache: HashMap::new(),
        }
    }

    /// Resolves all placeholders in `input`.
    ///
    /// Temporary values win over environment values. Unknown names are
    /// left in place as `{{name}}`.
    pub fn resolve(&mut self, input: &str) -> ResolutionResult {
        let references = parse_variables(input);
        if references.is_empty() {
            return ResolutionResult::no_variables(input);
        }

        let mut resolved_variables = Vec::new();
        let mut unresolved = Vec::new();
        let mut result = String::with_capacity(input.len());
        let mut last_end = 0;

        for reference in &references {
            result.push_str(&input[last_end..reference.span.start]);

            if let Some(resolved) = self.resolve_variable(&reference.name) {
                result.push_str(&resolved.value);
                resolved_variables.push(resolved);
            } else {
                result.push_str(&input[reference.span.clone()]);
                unresolved.push(reference.name.clone());
            }

            last_end = reference.span.end;
        }
        result.push_str(&input[last_end..]);

        ResolutionResult {
            resolved: result,
            resolved_variables,
            unresolved,
        }
    }

    /// Resolves placeholders in every textual field of `request`.
    ///
    /// Returns the distinct names that stayed unresolved.
    pub fn resolve_request(&mut self, request: &mut PreparedRequest) -> Vec<String> {
        let mut unresolved: Vec<String> = Vec::new();
        request.map_text(|text| {
            let result = self.resolve(text);
            for name in result.unresolved {
                if !unresolved.contains(&name) {
                    unresolved.push(name);
                }
            }
            result.resolved
        });
        unresolved
    }

    fn resolve_variable(&mut self, name: &str) -> Option<ResolvedVariable> {
        if let Some(found) = self.store.resolve(name) {
            return Some(found);
        }
        if !name.starts_with('$') {
            return None;
        }

        let value = if let Some(cached) = self.builtin_cache.get(name) {
            cached.clone()
        } else {
            let generated = BuiltinVariables::resolve(name)?;
            self.builtin_cache
                .insert(name.to_string(), generated.clone());
            generated
        };

        Some(ResolvedVariable {
            name: name.to_string(),
            value,
            scope: VariableScope::Builtin,
        })
    }
}

/// Interpolates `request` in place against `store` in a fresh session.
pub fn interpolate_request(store: &VariableStore, request: &mut PreparedRequest) -> Vec<String> {
    VariableResolver::new(store).resolve_request(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_domain::environment::VariableMap;
    use courier_domain::request::{Header, QueryParam};
    use pretty_assertions::assert_eq;

    fn store() -> VariableStore {
        let env: VariableMap = [
            ("host".to_string(), "api.example.com".to_string()),
            ("version".to_string(), "v1".to_string()),
            ("token".to_string(), "env-token".to_string()),
        ]
        .into();
        VariableStore::with_environment(env)
    }

    #[test]
    fn test_resolve_environment() {
        let store = store();
        let result = VariableResolver::new(&store).resolve("https://{{host}}/{{version}}/users");
        assert_eq!(result.resolved, "https://api.example.com/v1/users");
        assert!(result.is_complete());
        assert_eq!(result.resolved_variables.len(), 2);
    }

    #[test]
    fn test_temporary_precedence() {
        let mut store = store();
        store.set(VariableScope::Temporary, "token", "tmp-token");
        let result = VariableResolver::new(&store).resolve("Bearer {{token}}");
        assert_eq!(result.resolved, "Bearer tmp-token");
        assert_eq!(result.resolved_variables[0].scope, VariableScope::Temporary);
    }

    #[test]
    fn test_unresolved_left_verbatim() {
        let store = store();
        let result = VariableResolver::new(&store).resolve("{{host}}/{{ missing }}/{{$unknown}}");
        assert_eq!(result.resolved, "api.example.com/{{ missing }}/{{$unknown}}");
        assert_eq!(result.unresolved, vec!["missing", "$unknown"]);
    }

    #[test]
    fn test_builtin_is_stable_within_session() {
        let store = store();
        let mut resolver = VariableResolver::new(&store);
        let first = resolver.resolve("{{$uuid}}").resolved;
        let second = resolver.resolve("{{$uuid}}").resolved;
        assert_eq!(first, second);
        assert_eq!(first.len(), 36);
    }

    #[test]
    fn test_store_value_shadows_builtin_name() {
        let mut store = store();
        store.set(VariableScope::Temporary, "$timestamp", "frozen");
        let result = VariableResolver::new(&store).resolve("{{$timestamp}}");
        assert_eq!(result.resolved, "frozen");
    }

    #[test]
    fn test_resolve_request_all_fields() {
        let store = store();
        let mut request = PreparedRequest {
            url: "https://{{host}}/{{version}}".to_string(),
            ..PreparedRequest::default()
        };
        request.headers.add(Header::new("Authorization", "Bearer {{token}}"));
        request.query.add(QueryParam::new("v", "{{version}}"));
        request.query.add(QueryParam::new("sig", "{{signature}}"));

        let unresolved = interpolate_request(&store, &mut request);

        assert_eq!(request.url, "https://api.example.com/v1");
        assert_eq!(request.headers.get("authorization"), Some("Bearer env-token"));
        assert_eq!(request.query.get("v"), Some("v1"));
        assert_eq!(request.query.get("sig"), Some("{{signature}}"));
        assert_eq!(unresolved, vec!["signature"]);
    }
}
