//! Environment persistence port
//!
//! Durable storage for the environment variable scope.

use async_trait::async_trait;

use courier_domain::environment::VariableMap;

/// Errors that can occur during environment persistence.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentStoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The stored data is not a flat string map.
    #[error("Invalid environment: {0}")]
    Invalid(String),
}

/// Storage for the durable environment scope.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    /// Loads the environment scope.
    ///
    /// # Errors
    /// Returns an error if the stored data cannot be read or decoded.
    async fn load(&self) -> Result<VariableMap, EnvironmentStoreError>;

    /// Replaces the stored environment scope.
    ///
    /// # Errors
    /// Returns an error if the data cannot be written.
    async fn save(&self, variables: &VariableMap) -> Result<(), EnvironmentStoreError>;
}
