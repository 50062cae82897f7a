//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod cancellation;
mod dispatcher;
mod environment_store;
mod script_engine;

pub use cancellation::CancellationToken;
pub use dispatcher::{DispatchError, RequestDispatcher};
pub use environment_store::{EnvironmentStore, EnvironmentStoreError};
pub use script_engine::{ExecutionInfo, ScriptEngine, ScriptScope};
