//! Query parameter types

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// A query parameter key-value pair.
///
/// Keys and values are kept exactly as written; they are treated as
/// already encoded when the URL is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// The parameter key
    pub key: String,
    /// The parameter value
    #[serde(default)]
    pub value: String,
    /// Whether this parameter is sent
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl QueryParam {
    /// Creates a new enabled query parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled query parameter.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(key, value)
        }
    }
}

/// An ordered collection of query parameters.
///
/// Positions are stable: nothing reorders entries once they are added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams {
    items: Vec<QueryParam>,
}

impl QueryParams {
    /// Creates an empty query parameter collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Splits a raw query string (without the leading `?`) into parameters.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => QueryParam::new(key, value),
                None => QueryParam::new(pair, ""),
            })
            .collect()
    }

    /// Adds a query parameter to the collection.
    pub fn add(&mut self, param: QueryParam) {
        self.items.push(param);
    }

    /// Appends every parameter of `other`.
    pub fn extend(&mut self, other: Self) {
        self.items.extend(other.items);
    }

    /// Returns an iterator over enabled parameters.
    pub fn enabled(&self) -> impl Iterator<Item = &QueryParam> {
        self.items.iter().filter(|p| p.enabled)
    }

    /// First value for `key`, enabled entries only.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.enabled()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Returns all parameters (enabled and disabled).
    #[must_use]
    pub fn all(&self) -> &[QueryParam] {
        &self.items
    }

    /// Mutable access to every entry.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut QueryParam> {
        self.items.iter_mut()
    }

    /// Overwrites values by position.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LengthMismatch`] and leaves every entry
    /// untouched when `values` does not have one entry per parameter.
    pub fn assign_values(&mut self, values: Vec<String>) -> Result<usize, SyncError> {
        if values.len() != self.items.len() {
            return Err(SyncError::LengthMismatch {
                snapshot: values.len(),
                native: self.items.len(),
            });
        }
        let mut changed = 0;
        for (param, value) in self.items.iter_mut().zip(values) {
            if param.value != value {
                param.value = value;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Renders enabled parameters as `k=v&k=v`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.enabled()
            .map(|p| {
                if p.value.is_empty() {
                    p.key.clone()
                } else {
                    format!("{}={}", p.key, p.value)
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Returns the number of parameters.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<QueryParam> for QueryParams {
    fn from_iter<T: IntoIterator<Item = QueryParam>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
