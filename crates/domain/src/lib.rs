//! Courier Domain - core types of the script bridge
//!
//! Variables, cookies, requests, responses, scripts and run reports.
//! Everything here is plain data with no I/O.

pub mod cookie;
pub mod environment;
pub mod error;
pub mod request;
pub mod response;
pub mod run;
pub mod scripting;
pub mod settings;
pub mod testing;

pub use cookie::{Cookie, SameSite, find_by_name, parse_set_cookie_headers};
pub use environment::{ResolvedVariable, VariableMap, VariableScope, VariableStore};
pub use error::{CookieParseError, DomainError, DomainResult, SyncError};
pub use request::{
    Header, Headers, HttpMethod, PreparedRequest, QueryParam, QueryParams, RequestBody,
    RequestBodyKind, RequestSpec,
};
pub use response::{HttpResponse, ResponseBody, StatusCode};
pub use run::{
    IterationData, RequestExecution, RequestStatus, ResponseSummary, RunPlan, RunReport,
    RunSummary,
};
pub use scripting::{
    ConsoleLevel, ConsoleLine, RequestScripts, Script, ScriptError, ScriptLanguage,
    ScriptOutcome, ScriptPhase, ScriptState,
};
pub use settings::{HttpSettings, RunnerSettings, ScriptingSettings, Settings};
pub use testing::{TestResult, TestSummary};
