//! Parser for `{{variable}}` placeholders
//!
//! Extracts placeholder references together with their byte spans.

use std::ops::Range;

/// A placeholder found in a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The variable name with surrounding whitespace trimmed.
    pub name: String,

    /// Whether this is a built-in variable (starts with `$`).
    pub is_builtin: bool,

    /// Byte range of the whole `{{...}}` token.
    pub span: Range<usize>,
}

impl VariableReference {
    /// Creates a new variable reference.
    #[must_use]
    pub fn new(name: impl Into<String>, span: Range<usize>) -> Self {
        let name = name.into();
        let is_builtin = name.starts_with('$');
        Self {
            name,
            is_builtin,
            span,
        }
    }
}

/// Extracts every `{{name}}` placeholder from `input`, left to right.
///
/// Empty placeholders (`{{ }}`) and an unterminated trailing `{{` are
/// ignored. A nested `{{` restarts the token, so `{{a{{b}}` yields `b`.
///
/// # Examples
///
/// ```
/// use courier_application::variable_resolver::parser::parse_variables;
///
/// let refs = parse_variables("Hello {{ name }}, id {{$uuid}}");
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].name, "name");
/// assert!(refs[1].is_builtin);
/// ```
#[must_use]
pub fn parse_variables(input: &str) -> Vec<VariableReference> {
    let mut references = Vec::new();
    let mut cursor = 0;

    while let Some(open) = input[cursor..].find("{{").map(|i| cursor + i) {
        let body_start = open + 2;
        let Some(close) = input[body_start..].find("}}").map(|i| body_start + i) else {
            break;
        };

        let body = &input[body_start..close];
        if let Some(nested) = body.rfind("{{") {
            cursor = body_start + nested;
            continue;
        }

        let name = body.trim();
        if !name.is_empty() {
            references.push(VariableReference::new(name, open..close + 2));
        }
        cursor = close + 2;
    }

    references
}

/// Returns true if the input contains at least one placeholder.
#[must_use]
pub fn has_variables(input: &str) -> bool {
    !parse_variables(input).is_empty()
}
