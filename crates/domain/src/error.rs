//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A `Set-Cookie` line could not be parsed.
    #[error(transparent)]
    Cookie(#[from] CookieParseError),

    /// A query snapshot no longer matches the list it was taken from.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Reasons a `Set-Cookie` line is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CookieParseError {
    /// The header line was empty.
    #[error("empty Set-Cookie line")]
    Empty,

    /// The first segment had no `=` separator.
    #[error("missing '=' in cookie pair: {0}")]
    MissingSeparator(String),

    /// The cookie name was empty.
    #[error("cookie name is empty in: {0}")]
    EmptyName(String),
}

/// A query snapshot changed shape between the read and the sync.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The snapshot holds a different number of entries than the native list.
    #[error("query snapshot has {snapshot} entries but the request has {native}")]
    LengthMismatch {
        /// Entries in the script snapshot.
        snapshot: usize,
        /// Entries in the prepared request.
        native: usize,
    },

    /// An entry was removed or its value cleared to `null` or `undefined`.
    #[error("query snapshot entry {0} has no value")]
    MissingValue(usize),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
