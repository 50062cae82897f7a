//! Deterministic JSON for environment files and run reports.
//!
//! Keys come out in `BTreeMap` order with 2-space indentation and a
//! trailing newline, so rewritten environment files diff cleanly.

mod json;

pub use json::{SerializationError, from_json, to_json_stable};
