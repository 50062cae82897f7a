//! Application error types

use courier_domain::DomainError;
use thiserror::Error;

use crate::ports::{DispatchError, EnvironmentStoreError};

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The request could not be dispatched.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The environment scope could not be loaded or saved.
    #[error("environment store error: {0}")]
    Environment(#[from] EnvironmentStoreError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
