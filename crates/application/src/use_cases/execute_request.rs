//! Execute Request Use Case
//!
//! Sequences one request execution: interpolate, pre-request script,
//! re-interpolate, dispatch, post-response script, status.

use std::sync::Arc;

use courier_domain::environment::VariableStore;
use courier_domain::request::{PreparedRequest, RequestSpec};
use courier_domain::response::HttpResponse;
use courier_domain::run::{IterationData, RequestExecution, RequestStatus, ResponseSummary};
use courier_domain::scripting::{ConsoleLine, ScriptError, ScriptOutcome, ScriptPhase};
use courier_domain::testing::TestResult;
use tracing::{Instrument, debug, info_span, warn};

use crate::ports::{ExecutionInfo, RequestDispatcher, ScriptEngine, ScriptScope};
use crate::variable_resolver::interpolate_request;

/// Where an execution sits inside a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunPosition<'a> {
    /// Zero-based iteration index.
    pub iteration: usize,
    /// Total iterations planned.
    pub iteration_count: usize,
    /// Current iteration data row, if any.
    pub data: Option<&'a IterationData>,
}

impl RunPosition<'_> {
    /// Position of a standalone request.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            iteration: 0,
            iteration_count: 1,
            data: None,
        }
    }
}

/// Per-execution accumulator for console output, tests and warnings.
///
/// Created when an execution starts and consumed into a
/// [`RequestExecution`] when it ends.
#[derive(Debug)]
pub struct ExecutionContext {
    info: ExecutionInfo,
    console: Vec<ConsoleLine>,
    tests: Vec<TestResult>,
    warnings: Vec<String>,
}

impl ExecutionContext {
    /// Starts a context for `spec` at `position`.
    #[must_use]
    pub fn new(spec: &RequestSpec, position: RunPosition<'_>) -> Self {
        Self {
            info: ExecutionInfo {
                request_id: spec.id,
                request_name: spec.name.clone(),
                iteration: position.iteration,
                iteration_count: position.iteration_count,
            },
            console: Vec::new(),
            tests: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Run position exposed to scripts.
    #[must_use]
    pub const fn info(&self) -> &ExecutionInfo {
        &self.info
    }

    /// Folds a script outcome in, returning its error if it failed.
    pub fn absorb(&mut self, outcome: ScriptOutcome) -> Option<ScriptError> {
        self.console.extend(outcome.console);
        self.tests.extend(outcome.tests);
        self.warnings.extend(outcome.warnings);
        outcome.error
    }

    /// Records a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Whether any recorded test failed.
    #[must_use]
    pub fn has_failed_tests(&self) -> bool {
        self.tests.iter().any(|t| !t.passed)
    }

    /// Consumes the context into a report.
    #[must_use]
    pub fn finish(
        self,
        request: &PreparedRequest,
        status: RequestStatus,
        response: Option<&HttpResponse>,
    ) -> RequestExecution {
        RequestExecution {
            request_id: self.info.request_id,
            request_name: self.info.request_name,
            iteration: self.info.iteration,
            url: request.url_string(),
            status,
            response: response.map(ResponseSummary::from),
            console: self.console,
            tests: self.tests,
            warnings: self.warnings,
        }
    }
}

/// Use case for executing a single request with its scripts.
///
/// # Example
///
/// ```ignore
/// let use_case = ExecuteRequest::new(Arc::new(dispatcher), Arc::new(engine));
/// let mut variables = VariableStore::new();
/// let report = use_case.execute(&spec, &mut variables, RunPosition::single()).await;
/// ```
pub struct ExecuteRequest<D: RequestDispatcher, E: ScriptEngine> {
    dispatcher: Arc<D>,
    engine: Arc<E>,
}

impl<D: RequestDispatcher, E: ScriptEngine> Clone for ExecuteRequest<D, E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<D: RequestDispatcher, E: ScriptEngine> ExecuteRequest<D, E> {
    /// Creates the use case over a dispatcher and a script engine.
    pub const fn new(dispatcher: Arc<D>, engine: Arc<E>) -> Self {
        Self { dispatcher, engine }
    }

    /// Executes `spec` once.
    ///
    /// Never fails as a whole: script errors and dispatch errors are
    /// reported through [`RequestExecution::status`].
    pub async fn execute(
        &self,
        spec: &RequestSpec,
        variables: &mut VariableStore,
        position: RunPosition<'_>,
    ) -> RequestExecution {
        let span = info_span!("request", name = %spec.name, iteration = position.iteration);
        self.execute_inner(spec, variables, position)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        spec: &RequestSpec,
        variables: &mut VariableStore,
        position: RunPosition<'_>,
    ) -> RequestExecution {
        let empty_row = IterationData::new();
        let data = position.data.unwrap_or(&empty_row);
        let mut context = ExecutionContext::new(spec, position);

        let mut request = PreparedRequest::from_spec(spec);
        interpolate_request(variables, &mut request);

        if spec.scripts.pre_request.should_run() {
            let outcome = self.engine.run(
                &spec.scripts.pre_request,
                ScriptScope {
                    phase: ScriptPhase::PreRequest,
                    variables,
                    request: &mut request,
                    response: None,
                    iteration_data: data,
                    info: context.info(),
                },
            );
            if let Some(error) = context.absorb(outcome) {
                warn!(%error, "pre-request script failed; request not sent");
                let status = RequestStatus::PreScriptFailed(error.to_string());
                return context.finish(&request, status, None);
            }
        }

        let unresolved = interpolate_request(variables, &mut request);
        if !unresolved.is_empty() {
            debug!(?unresolved, "placeholders left unresolved");
        }

        if let Err(error) = request.full_url() {
            warn!(%error, "request URL is not dispatchable");
            return context.finish(&request, RequestStatus::DispatchFailed(error.to_string()), None);
        }

        let response = match self.dispatcher.dispatch(&request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "dispatch failed");
                let status = RequestStatus::DispatchFailed(error.to_string());
                return context.finish(&request, status, None);
            }
        };
        debug!(status = response.status.as_u16(), elapsed_ms = response.elapsed_ms(), "response received");

        if spec.scripts.post_response.should_run() {
            let outcome = self.engine.run(
                &spec.scripts.post_response,
                ScriptScope {
                    phase: ScriptPhase::PostResponse,
                    variables,
                    request: &mut request,
                    response: Some(&response),
                    iteration_data: data,
                    info: context.info(),
                },
            );
            if let Some(error) = context.absorb(outcome)
                && error.is_parse()
            {
                warn!(%error, "post-response script could not run");
                let status = RequestStatus::PostScriptFailed(error.to_string());
                return context.finish(&request, status, Some(&response));
            }
        }

        let status = if context.has_failed_tests() {
            RequestStatus::AssertionFailed
        } else {
            RequestStatus::Passed
        };
        context.finish(&request, status, Some(&response))
    }
}
