//! Boa-backed script engine.

use std::mem;
use std::rc::Rc;
use std::time::Instant;

use boa_engine::context::ContextBuilder;
use boa_engine::job::SimpleJobQueue;
use boa_engine::vm::RuntimeLimits;
use boa_engine::{Context, Script as CompiledScript, Source};
use boa_gc::{Gc, GcRefCell};
use courier_application::{ScriptEngine, ScriptScope};
use courier_domain::scripting::{Script, ScriptError, ScriptOutcome, ScriptState};
use courier_domain::settings::ScriptingSettings;
use courier_domain::testing::TestResult;
use tracing::{debug, debug_span};

use super::bridge::{Bridge, BridgeState};
use super::convert::describe_error;
use super::sandbox::provision;

/// Runs scripts in a fresh boa context per call.
#[derive(Debug, Clone, Default)]
pub struct BoaScriptEngine {
    settings: ScriptingSettings,
}

impl BoaScriptEngine {
    /// Creates an engine with the given limits.
    #[must_use]
    pub const fn new(settings: ScriptingSettings) -> Self {
        Self { settings }
    }

    fn context(&self) -> Result<Context, ScriptError> {
        let mut ctx = ContextBuilder::new()
            .job_queue(Rc::new(SimpleJobQueue::new()))
            .build()
            .map_err(|e| ScriptError::Setup(e.to_string()))?;
        let mut limits = RuntimeLimits::default();
        limits.set_loop_iteration_limit(self.settings.loop_iteration_limit);
        limits.set_recursion_limit(self.settings.recursion_limit);
        ctx.set_runtime_limits(limits);
        Ok(ctx)
    }

    fn execute(&self, source: &str, bridge: &Bridge, lifecycle: &mut Lifecycle) -> Result<(), ScriptError> {
        lifecycle.advance(ScriptState::Compiling);
        let mut ctx = self.context()?;
        let compiled = CompiledScript::parse(Source::from_bytes(source), None, &mut ctx)
            .map_err(|e| ScriptError::Parse(describe_error(&e, &mut ctx)))?;

        lifecycle.advance(ScriptState::Running);
        provision(&mut ctx, bridge).map_err(|e| ScriptError::Setup(describe_error(&e, &mut ctx)))?;
        compiled
            .evaluate(&mut ctx)
            .map_err(|e| ScriptError::Runtime(describe_error(&e, &mut ctx)))?;
        bridge.borrow_mut().draining = true;
        ctx.run_jobs();
        Ok(())
    }
}

/// Tracks the runner state and logs each transition.
struct Lifecycle {
    state: ScriptState,
}

impl Lifecycle {
    const fn new() -> Self {
        Self {
            state: ScriptState::Idle,
        }
    }

    fn advance(&mut self, next: ScriptState) {
        debug_assert!(self.state.can_transition_to(next), "{:?} -> {next:?}", self.state);
        debug!(from = ?self.state, to = ?next, "script state");
        self.state = next;
    }
}

impl ScriptEngine for BoaScriptEngine {
    fn run(&self, script: &Script, scope: ScriptScope<'_>) -> ScriptOutcome {
        let phase = scope.phase;
        let span = debug_span!("script", phase = phase.label(), request = %scope.info.request_name);
        let _enter = span.enter();
        let started = Instant::now();

        let bridge: Bridge = Gc::new(GcRefCell::new(BridgeState::new(
            phase,
            mem::take(scope.variables),
            mem::take(scope.request),
            scope.response.cloned(),
            scope.iteration_data.clone(),
            scope.info,
            self.settings.echo_console,
        )));

        let mut lifecycle = Lifecycle::new();
        let result = self.execute(&script.content, &bridge, &mut lifecycle);
        let final_state = if result.is_ok() {
            ScriptState::Completed
        } else {
            ScriptState::Failed
        };
        lifecycle.advance(final_state);

        let mut state = bridge.borrow_mut();
        *scope.variables = mem::take(&mut state.variables);
        *scope.request = mem::take(&mut state.request);
        let mut tests = mem::take(&mut state.tests);
        let console = mem::take(&mut state.console);
        let warnings = mem::take(&mut state.warnings);
        drop(state);

        let error = result.err();
        if let Some(ScriptError::Runtime(message)) = &error {
            tests.push(TestResult::fail(phase.label(), message.clone()));
        }
        if let Some(error) = &error {
            debug!(%error, "script failed");
        }

        ScriptOutcome {
            state: lifecycle.state,
            error,
            console,
            tests,
            warnings,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
