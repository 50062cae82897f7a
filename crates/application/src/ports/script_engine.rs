//! Script engine port

use courier_domain::environment::VariableStore;
use courier_domain::request::PreparedRequest;
use courier_domain::response::HttpResponse;
use courier_domain::run::IterationData;
use courier_domain::scripting::{Script, ScriptOutcome, ScriptPhase};
use uuid::Uuid;

/// Where in a run the script executes; exposed to scripts as `pm.info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionInfo {
    /// Template id.
    pub request_id: Uuid,
    /// Template name.
    pub request_name: String,
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Total iterations planned.
    pub iteration_count: usize,
}

/// Everything a script may see or change during one run.
pub struct ScriptScope<'a> {
    /// Pre-request or post-response.
    pub phase: ScriptPhase,
    /// Variable store; scripts write the environment and temporary scopes.
    pub variables: &'a mut VariableStore,
    /// The in-flight request; only explicit view operations change it.
    pub request: &'a mut PreparedRequest,
    /// The response, for post-response scripts.
    pub response: Option<&'a HttpResponse>,
    /// Current iteration data row.
    pub iteration_data: &'a IterationData,
    /// Run position.
    pub info: &'a ExecutionInfo,
}

/// Runs one script in an isolated sandbox.
///
/// Implementations must not let state survive between calls: each call
/// gets a fresh sandbox with freshly provisioned libraries.
pub trait ScriptEngine: Send + Sync {
    /// Compiles and runs `script` against `scope`.
    ///
    /// Failures are reported in the returned outcome, never as panics.
    fn run(&self, script: &Script, scope: ScriptScope<'_>) -> ScriptOutcome;
}
