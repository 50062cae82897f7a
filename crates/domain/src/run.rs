//! Execution reports for single requests and batch runs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::environment::VariableMap;
use crate::request::RequestSpec;
use crate::response::HttpResponse;
use crate::scripting::ConsoleLine;
use crate::testing::{TestResult, TestSummary};

/// Terminal status of one request execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum RequestStatus {
    /// Sent, and every recorded test passed.
    Passed,
    /// Sent, and at least one test failed.
    AssertionFailed,
    /// The pre-request script failed; nothing was sent.
    PreScriptFailed(String),
    /// The post-response script could not be parsed; the request was sent.
    PostScriptFailed(String),
    /// The dispatcher could not deliver the request.
    DispatchFailed(String),
}

impl RequestStatus {
    /// Short user-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::AssertionFailed => "failed",
            Self::PreScriptFailed(_) => "pre-script failed",
            Self::PostScriptFailed(_) => "post-script failed",
            Self::DispatchFailed(_) => "dispatch failed",
        }
    }

    /// Whether the request counts as a success.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether the request went out on the wire.
    #[must_use]
    pub const fn was_sent(&self) -> bool {
        matches!(
            self,
            Self::Passed | Self::AssertionFailed | Self::PostScriptFailed(_)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed | Self::AssertionFailed => f.write_str(self.label()),
            Self::PreScriptFailed(msg) | Self::PostScriptFailed(msg) | Self::DispatchFailed(msg) => {
                write!(f, "{}: {msg}", self.label())
            }
        }
    }
}

/// Condensed view of a response for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSummary {
    /// Status code.
    pub status: u16,
    /// Elapsed milliseconds.
    pub elapsed_ms: u64,
    /// Body size in bytes.
    pub size: u64,
}

impl From<&HttpResponse> for ResponseSummary {
    fn from(response: &HttpResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            elapsed_ms: response.elapsed_ms(),
            size: response.body.size(),
        }
    }
}

/// Everything one request execution produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestExecution {
    /// Template id.
    pub request_id: Uuid,
    /// Template name.
    pub request_name: String,
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Final URL as sent (or as it would have been sent).
    pub url: String,
    /// Terminal status.
    pub status: RequestStatus,
    /// Response details when the request was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSummary>,
    /// Console output of both scripts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console: Vec<ConsoleLine>,
    /// Test results of both scripts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestResult>,
    /// Non-fatal warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RequestExecution {
    /// Tally of this execution's tests.
    #[must_use]
    pub fn test_summary(&self) -> TestSummary {
        TestSummary::of(&self.tests)
    }
}

/// One row of external iteration data.
pub type IterationData = VariableMap;

/// An ordered selection of request templates to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    /// Plan name, copied into the report.
    pub name: String,
    /// Requests in execution order.
    #[serde(default)]
    pub requests: Vec<RequestSpec>,
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Requests attempted.
    pub requests: usize,
    /// Requests that passed.
    pub passed: usize,
    /// Requests with failing tests.
    pub assertion_failed: usize,
    /// Requests blocked or broken by scripts.
    pub script_failed: usize,
    /// Requests that could not be dispatched.
    pub dispatch_failed: usize,
    /// Tests across all requests.
    pub tests: TestSummary,
}

/// Report of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub id: Uuid,
    /// Plan name.
    pub name: String,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end.
    pub finished_at: DateTime<Utc>,
    /// Iterations planned.
    pub iterations_planned: usize,
    /// Iterations that started.
    pub iterations_started: usize,
    /// Whether the run stopped on the cancellation flag.
    pub cancelled: bool,
    /// Request executions in run order.
    pub executions: Vec<RequestExecution>,
    /// Set when the environment scope could not be written back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

impl RunReport {
    /// Start an empty report.
    #[must_use]
    pub fn start(name: impl Into<String>, iterations_planned: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            started_at: now,
            finished_at: now,
            iterations_planned,
            iterations_started: 0,
            cancelled: false,
            executions: Vec::new(),
            persistence_error: None,
        }
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Totals over all executions.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            requests: self.executions.len(),
            ..RunSummary::default()
        };
        let mut tests = Vec::new();
        for execution in &self.executions {
            match execution.status {
                RequestStatus::Passed => summary.passed += 1,
                RequestStatus::AssertionFailed => summary.assertion_failed += 1,
                RequestStatus::PreScriptFailed(_) | RequestStatus::PostScriptFailed(_) => {
                    summary.script_failed += 1;
                }
                RequestStatus::DispatchFailed(_) => summary.dispatch_failed += 1,
            }
            tests.extend(execution.tests.iter().cloned());
        }
        summary.tests = TestSummary::of(&tests);
        summary
    }

    /// Whether every execution passed and the run was not cancelled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.executions.iter().all(|e| e.status.is_passed())
    }
}
