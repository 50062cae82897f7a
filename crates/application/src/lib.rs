//! Courier Application - Execution orchestration
//!
//! This crate sequences request executions around the script engine and
//! the transport. Everything outside the core is reached through the
//! traits in [`ports`].

pub mod error;
pub mod ports;
pub mod use_cases;
pub mod variable_resolver;

pub use error::{ApplicationError, ApplicationResult};
pub use ports::{
    CancellationToken, DispatchError, EnvironmentStore, EnvironmentStoreError, ExecutionInfo,
    RequestDispatcher, ScriptEngine, ScriptScope,
};
pub use use_cases::{
    CollectionRunner, ExecuteRequest, ExecutionContext, RunOptions, RunOutcome, RunPosition,
};
pub use variable_resolver::{ResolutionResult, VariableResolver, interpolate_request};
