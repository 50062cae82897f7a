//! Run collection use case
//!
//! Batch and data-driven execution: N iterations over an ordered selection
//! of requests, with the temporary scope reset before every iteration.

use std::sync::Arc;
use std::time::Duration;

use courier_domain::environment::VariableStore;
use courier_domain::run::{IterationData, RunPlan, RunReport};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use super::execute_request::{ExecuteRequest, RunPosition};
use crate::error::ApplicationResult;
use crate::ports::{CancellationToken, EnvironmentStore, RequestDispatcher, ScriptEngine};

/// Options for one batch run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit iteration count; falls back to the number of data rows.
    pub iterations: Option<usize>,
    /// Iteration data rows, one per iteration.
    pub data: Vec<IterationData>,
    /// Pause between consecutive requests.
    pub delay: Duration,
    /// Write the environment scope back through the store afterwards.
    pub persist_environment: bool,
}

impl RunOptions {
    /// Sets the iteration count.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Sets the iteration data rows.
    #[must_use]
    pub fn with_data(mut self, data: Vec<IterationData>) -> Self {
        self.data = data;
        self
    }

    /// Sets the delay between requests.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enables environment persistence.
    #[must_use]
    pub const fn with_persistence(mut self, persist: bool) -> Self {
        self.persist_environment = persist;
        self
    }

    /// Number of iterations this run will attempt.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        self.iterations
            .unwrap_or(if self.data.is_empty() { 1 } else { self.data.len() })
    }

    /// Data row for `iteration`; runs longer than the data reuse the last row.
    #[must_use]
    pub fn row(&self, iteration: usize) -> Option<&IterationData> {
        self.data.get(iteration).or_else(|| self.data.last())
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The run report.
    pub report: RunReport,
    /// Variable store as the run left it.
    pub variables: VariableStore,
}

/// Runs request plans over iterations.
pub struct CollectionRunner<D: RequestDispatcher, E: ScriptEngine> {
    execute: ExecuteRequest<D, E>,
    store: Option<Arc<dyn EnvironmentStore>>,
}

impl<D: RequestDispatcher, E: ScriptEngine> CollectionRunner<D, E> {
    /// Creates a runner without environment persistence.
    pub const fn new(execute: ExecuteRequest<D, E>) -> Self {
        Self {
            execute,
            store: None,
        }
    }

    /// Attaches an environment store used to persist the environment scope.
    #[must_use]
    pub fn with_environment_store(mut self, store: Arc<dyn EnvironmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the starting variable store from the attached environment store.
    ///
    /// # Errors
    /// Returns [`crate::ApplicationError::Environment`] when the store cannot be read.
    pub async fn load_variables(&self) -> ApplicationResult<VariableStore> {
        match &self.store {
            Some(store) => Ok(VariableStore::with_environment(store.load().await?)),
            None => Ok(VariableStore::new()),
        }
    }

    /// Runs `plan` to completion or cancellation.
    pub async fn run(
        &self,
        plan: &RunPlan,
        variables: VariableStore,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let iteration_count = options.iteration_count();
        let mut report = RunReport::start(&plan.name, iteration_count);
        let span = info_span!("run", id = %report.id, plan = %plan.name);

        async move {
            info!(
                iterations = iteration_count,
                requests = plan.requests.len(),
                "run started"
            );
            let mut variables = variables;

            'iterations: for iteration in 0..iteration_count {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                report.iterations_started += 1;

                let row = options.row(iteration);
                variables.clear();
                if let Some(row) = row {
                    variables.seed_temporary(row);
                }
                debug!(iteration, seeded = row.map_or(0, |r| r.len()), "iteration started");

                for (index, spec) in plan.requests.iter().enumerate() {
                    if cancel.is_cancelled() {
                        report.cancelled = true;
                        break 'iterations;
                    }
                    if index > 0 && !options.delay.is_zero() {
                        tokio::time::sleep(options.delay).await;
                    }
                    let position = RunPosition {
                        iteration,
                        iteration_count,
                        data: row,
                    };
                    let execution = self.execute.execute(spec, &mut variables, position).await;
                    report.executions.push(execution);
                }
            }

            if options.persist_environment
                && let Some(store) = &self.store
                && let Err(error) = store.save(variables.environment()).await
            {
                warn!(%error, "environment could not be persisted");
                report.persistence_error = Some(error.to_string());
            }

            report.finish();
            let summary = report.summary();
            info!(
                passed = summary.passed,
                failed = summary.requests - summary.passed,
                cancelled = report.cancelled,
                "run finished"
            );
            RunOutcome { report, variables }
        }
        .instrument(span)
        .await
    }
}

impl<D, E> CollectionRunner<D, E>
where
    D: RequestDispatcher + 'static,
    E: ScriptEngine + 'static,
{
    /// Runs `plan` on its own tokio task.
    pub fn spawn(
        self: Arc<Self>,
        plan: RunPlan,
        variables: VariableStore,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> JoinHandle<RunOutcome> {
        tokio::spawn(async move { self.run(&plan, variables, &options, &cancel).await })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use courier_domain::environment::{VariableMap, VariableScope};
    use courier_domain::request::RequestSpec;
    use courier_domain::run::RequestStatus;
    use pretty_assertions::assert_eq;

    use super::super::execute_request::tests::{MockDispatcher, ScriptedEngine};
    use crate::ports::EnvironmentStoreError;

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<VariableMap>>,
        fail: bool,
    }

    #[async_trait]
    impl EnvironmentStore for MemoryStore {
        async fn load(&self) -> Result<VariableMap, EnvironmentStoreError> {
            Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, variables: &VariableMap) -> Result<(), EnvironmentStoreError> {
            if self.fail {
                return Err(EnvironmentStoreError::Invalid("read-only".to_string()));
            }
            *self.saved.lock().unwrap() = Some(variables.clone());
            Ok(())
        }
    }

    fn runner() -> (CollectionRunner<MockDispatcher, ScriptedEngine>, Arc<MockDispatcher>) {
        let dispatcher = Arc::new(MockDispatcher::ok());
        let execute = ExecuteRequest::new(Arc::clone(&dispatcher), Arc::new(ScriptedEngine));
        (CollectionRunner::new(execute), dispatcher)
    }

    fn row(pairs: &[(&str, &str)]) -> IterationData {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn plan(requests: Vec<RequestSpec>) -> RunPlan {
        RunPlan {
            name: "plan".to_string(),
            requests,
        }
    }

    #[test]
    fn test_iteration_count() {
        assert_eq!(RunOptions::default().iteration_count(), 1);
        let options = RunOptions::default().with_data(vec![row(&[]), row(&[])]);
        assert_eq!(options.iteration_count(), 2);
        assert_eq!(options.clone().with_iterations(5).iteration_count(), 5);
        assert!(options.row(4).is_some());
    }

    #[tokio::test]
    async fn test_iterations_see_their_own_row() {
        let (runner, dispatcher) = runner();
        let plan = plan(vec![
            RequestSpec::get("User", "https://example.com/users/{{user}}")
                .with_post_response("record-data user"),
        ]);
        let options =
            RunOptions::default().with_data(vec![row(&[("user", "alice")]), row(&[("user", "bob")])]);

        let outcome = runner
            .run(&plan, VariableStore::new(), &options, &CancellationToken::new())
            .await;

        let urls: Vec<String> = dispatcher.sent().iter().map(|r| r.url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/users/alice".to_string(),
                "https://example.com/users/bob".to_string(),
            ]
        );
        assert_eq!(outcome.report.iterations_started, 2);
        assert_eq!(outcome.report.executions[1].console[0].message, "bob");
    }

    #[tokio::test]
    async fn test_temporary_scope_cleared_between_iterations() {
        let (runner, _) = runner();
        let plan = plan(vec![
            RequestSpec::get("Read", "https://example.com").with_post_response("record-data token"),
            RequestSpec::get("Write", "https://example.com").with_post_response("set token t1"),
        ]);
        let options = RunOptions::default().with_iterations(2);

        let outcome = runner
            .run(&plan, VariableStore::new(), &options, &CancellationToken::new())
            .await;

        let seen: Vec<&str> = outcome
            .report
            .executions
            .iter()
            .filter(|e| e.request_name == "Read")
            .map(|e| e.console[0].message.as_str())
            .collect();
        assert_eq!(seen, vec!["<none>", "<none>"]);
    }

    #[tokio::test]
    async fn test_environment_survives_iterations_and_is_persisted() {
        let (runner, _) = runner();
        let store = Arc::new(MemoryStore::default());
        let runner = runner.with_environment_store(store.clone());
        let plan = plan(vec![
            RequestSpec::get("Read", "https://example.com").with_pre_request("record-data token"),
            RequestSpec::get("Write", "https://example.com").with_post_response("env token t1"),
        ]);
        let options = RunOptions::default()
            .with_iterations(2)
            .with_persistence(true);

        let outcome = runner
            .run(&plan, VariableStore::new(), &options, &CancellationToken::new())
            .await;

        assert_eq!(outcome.report.executions[2].console[0].message, "t1");
        assert_eq!(
            outcome.variables.get_in(VariableScope::Environment, "token"),
            Some("t1")
        );
        let saved = store.saved.lock().unwrap().clone().unwrap();
        assert_eq!(saved.get("token").map(String::as_str), Some("t1"));
        assert!(outcome.report.persistence_error.is_none());
    }

    #[tokio::test]
    async fn test_load_variables_from_store() {
        let (runner, _) = runner();
        assert_eq!(runner.load_variables().await.unwrap(), VariableStore::new());

        let store = Arc::new(MemoryStore::default());
        *store.saved.lock().unwrap() = Some(row(&[("host", "example.com")]));
        let runner = runner.with_environment_store(store);

        let variables = runner.load_variables().await.unwrap();
        assert_eq!(variables.get("host"), Some("example.com"));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        let (runner, _) = runner();
        let store = Arc::new(MemoryStore {
            fail: true,
            ..MemoryStore::default()
        });
        let runner = runner.with_environment_store(store);
        let options = RunOptions::default().with_persistence(true);

        let outcome = runner
            .run(
                &plan(vec![RequestSpec::get("A", "https://example.com")]),
                VariableStore::new(),
                &options,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            outcome.report.persistence_error.as_deref(),
            Some("Invalid environment: read-only")
        );
        assert!(outcome.report.is_success());
    }

    #[tokio::test]
    async fn test_pre_script_failure_does_not_stop_run() {
        let (runner, dispatcher) = runner();
        let plan = plan(vec![
            RequestSpec::get("Broken", "https://example.com/a").with_pre_request("parse-error"),
            RequestSpec::get("Fine", "https://example.com/b"),
        ]);

        let outcome = runner
            .run(
                &plan,
                VariableStore::new(),
                &RunOptions::default(),
                &CancellationToken::new(),
            )
            .await;

        let statuses: Vec<&str> = outcome
            .report
            .executions
            .iter()
            .map(|e| e.status.label())
            .collect();
        assert_eq!(statuses, vec!["pre-script failed", "passed"]);
        assert_eq!(dispatcher.sent().len(), 1);
        assert!(!outcome.report.is_success());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (runner, dispatcher) = runner();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = runner
            .run(
                &plan(vec![RequestSpec::get("A", "https://example.com")]),
                VariableStore::new(),
                &RunOptions::default().with_iterations(3),
                &cancel,
            )
            .await;

        assert!(outcome.report.cancelled);
        assert_eq!(outcome.report.iterations_started, 0);
        assert!(outcome.report.executions.is_empty());
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_run_stops_after_cancellation() {
        let (runner, dispatcher) = runner();
        let runner = Arc::new(runner);
        let cancel = CancellationToken::new();
        let plan = plan(vec![
            RequestSpec::get("A", "https://example.com/a"),
            RequestSpec::get("B", "https://example.com/b"),
        ]);
        let options = RunOptions::default()
            .with_iterations(1000)
            .with_delay(Duration::from_millis(5));

        let handle = Arc::clone(&runner).spawn(plan, VariableStore::new(), options, cancel.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        let outcome = handle.await.unwrap();

        assert!(outcome.report.cancelled);
        assert!(outcome.report.iterations_started < 1000);
        assert_eq!(dispatcher.sent().len(), outcome.report.executions.len());
        assert!(
            outcome
                .report
                .executions
                .iter()
                .all(|e| e.status == RequestStatus::Passed)
        );
    }
}
