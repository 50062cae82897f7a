//! File-based environment store.
//!
//! One environment per JSON file, stored as a flat object:
//! ```text
//! {
//!   "app_code": "myAppCode",
//!   "secret_key": "1234567890123456"
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courier_application::{EnvironmentStore, EnvironmentStoreError};
use courier_domain::environment::VariableMap;
use serde_json::Value;
use tracing::debug;

use crate::serialization::{from_json, to_json_stable};

/// Environment scope persisted as a single JSON file.
#[derive(Debug, Clone)]
pub struct FileEnvironmentStore {
    path: PathBuf,
}

impl FileEnvironmentStore {
    /// Creates a store for the file at `path`; the file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Flattens a JSON object into variables; numbers and booleans are
/// stored as their JSON text.
fn to_variables(value: Value) -> Result<VariableMap, EnvironmentStoreError> {
    let Value::Object(entries) = value else {
        return Err(EnvironmentStoreError::Invalid(
            "expected a JSON object of name/value pairs".to_string(),
        ));
    };
    entries
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(text) => Ok((name, text)),
            Value::Number(_) | Value::Bool(_) => Ok((name, value.to_string())),
            other => Err(EnvironmentStoreError::Invalid(format!(
                "variable '{name}' has unsupported value {other}"
            ))),
        })
        .collect()
}

#[async_trait]
impl EnvironmentStore for FileEnvironmentStore {
    async fn load(&self) -> Result<VariableMap, EnvironmentStoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no environment file; starting empty");
                return Ok(VariableMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        let value: Value =
            from_json(&content).map_err(|e| EnvironmentStoreError::Serialization(e.to_string()))?;
        to_variables(value)
    }

    async fn save(&self, variables: &VariableMap) -> Result<(), EnvironmentStoreError> {
        let content =
            to_json_stable(variables).map_err(|e| EnvironmentStoreError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Replace atomically.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), count = variables.len(), "environment saved");
        Ok(())
    }
}
