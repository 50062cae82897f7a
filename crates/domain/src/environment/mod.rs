//! Variable scopes and the layered variable store

mod store;

pub use store::{ResolvedVariable, VariableMap, VariableScope, VariableStore};
