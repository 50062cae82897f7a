//! Application use cases (execution orchestration).

mod execute_request;
mod run_collection;

pub use execute_request::{ExecuteRequest, ExecutionContext, RunPosition};
pub use run_collection::{CollectionRunner, RunOptions, RunOutcome};
