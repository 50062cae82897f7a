//! Variable resolution module
//!
//! Parsing and resolution of `{{variable}}` placeholders.
//!
//! # Usage
//!
//! ```
//! use courier_application::variable_resolver::VariableResolver;
//! use courier_domain::environment::{VariableScope, VariableStore};
//!
//! let mut store = VariableStore::new();
//! store.set(VariableScope::Environment, "host", "localhost");
//!
//! let result = VariableResolver::new(&store).resolve("http://{{host}}/api");
//! assert_eq!(result.resolved, "http://localhost/api");
//! ```

pub mod builtins;
pub mod engine;
pub mod parser;

pub use builtins::BuiltinVariables;
pub use engine::{ResolutionResult, VariableResolver, interpolate_request};
pub use parser::{VariableReference, has_variables, parse_variables};
