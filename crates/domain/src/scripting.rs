//! Pre-request and post-response scripting.
//!
//! Types describing script sources, the runner's lifecycle and the data a
//! finished run hands back to the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::testing::TestResult;

/// A script that can be executed before a request or after a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Script {
    /// The script source.
    pub content: String,
    /// Whether the script is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Script language.
    #[serde(default)]
    pub language: ScriptLanguage,
}

const fn default_enabled() -> bool {
    true
}

impl Default for Script {
    fn default() -> Self {
        Self::with_content("")
    }
}

impl Script {
    /// Create a new script with content.
    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            enabled: true,
            language: ScriptLanguage::default(),
        }
    }

    /// Check if the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Check if the script should run.
    #[must_use]
    pub fn should_run(&self) -> bool {
        self.enabled && !self.is_empty()
    }
}

/// Script language type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptLanguage {
    /// JavaScript against the `pm` object model.
    #[default]
    JavaScript,
}

/// Pre-request and post-response scripts for a request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RequestScripts {
    /// Script to run before the request.
    #[serde(default, skip_serializing_if = "Script::is_empty")]
    pub pre_request: Script,
    /// Script to run after the response.
    #[serde(default, skip_serializing_if = "Script::is_empty")]
    pub post_response: Script,
}

impl RequestScripts {
    /// Check if both scripts are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_request.is_empty() && self.post_response.is_empty()
    }
}

/// When a script runs relative to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    /// Before the request is sent.
    PreRequest,
    /// After the response arrives.
    PostResponse,
}

impl ScriptPhase {
    /// Display label, also used as the name of synthetic failing tests.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PreRequest => "Pre-request script",
            Self::PostResponse => "Post-response script",
        }
    }

    /// The `pm.info.eventName` value.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PreRequest => "prerequest",
            Self::PostResponse => "test",
        }
    }
}

impl fmt::Display for ScriptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Script runner lifecycle.
///
/// `Idle → Compiling → Running → Completed`, with `Failed` reachable from
/// `Compiling` and `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptState {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// Source is being parsed.
    Compiling,
    /// The script body is executing.
    Running,
    /// Finished without an uncaught exception.
    Completed,
    /// Parse or runtime failure.
    Failed,
}

impl ScriptState {
    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Compiling)
                | (Self::Compiling, Self::Running | Self::Failed)
                | (Self::Running, Self::Completed | Self::Failed)
        )
    }

    /// Whether the runner has stopped.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a script did not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ScriptError {
    /// The source could not be parsed.
    #[error("script could not be parsed: {0}")]
    Parse(String),
    /// An exception escaped the script body.
    #[error("{0}")]
    Runtime(String),
    /// The sandbox could not be prepared.
    #[error("script sandbox could not be prepared: {0}")]
    Setup(String),
}

impl ScriptError {
    /// Whether this failure means the script never ran.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Setup(_))
    }
}

/// Console method that produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    /// `console.log`
    Log,
    /// `console.info`
    Info,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
    /// `console.debug`
    Debug,
}

impl ConsoleLevel {
    /// Parse a console method name; unknown names map to `Log`.
    #[must_use]
    pub fn from_method(name: &str) -> Self {
        match name {
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "debug" => Self::Debug,
            _ => Self::Log,
        }
    }
}

/// One captured console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    /// Console method.
    pub level: ConsoleLevel,
    /// Text of the line.
    pub message: String,
}

impl ConsoleLine {
    /// Create a console line.
    #[must_use]
    pub fn new(level: ConsoleLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// What a single script run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutcome {
    /// Final runner state.
    pub state: ScriptState,
    /// Failure, if the run did not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ScriptError>,
    /// Captured console output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console: Vec<ConsoleLine>,
    /// Assertion results in recording order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestResult>,
    /// Non-fatal problems such as sync no-ops or skipped cookies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Wall time spent in the runner.
    pub elapsed_ms: u64,
}

impl ScriptOutcome {
    /// Outcome for a script that was not run.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            state: ScriptState::Completed,
            ..Self::default()
        }
    }

    /// Whether the script ran to completion.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.state, ScriptState::Completed)
    }

    /// Whether the script failed before running any code.
    #[must_use]
    pub fn failed_to_parse(&self) -> bool {
        self.error.as_ref().is_some_and(ScriptError::is_parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_script_should_run() {
        assert!(!Script::default().should_run());
        assert!(Script::with_content("pm.test('a', () => {});").should_run());

        let mut script = Script::with_content("console.log(1)");
        script.enabled = false;
        assert!(!script.should_run());
    }

    #[test]
    fn test_state_transitions() {
        use ScriptState::{Compiling, Completed, Failed, Idle, Running};

        assert!(Idle.can_transition_to(Compiling));
        assert!(Compiling.can_transition_to(Failed));
        assert!(Running.can_transition_to(Completed));
        assert!(!Idle.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Compiling.can_transition_to(Completed));
        assert!(Failed.is_terminal());
    }

    #[test]
    fn test_error_messages() {
        let err = ScriptError::Parse("unexpected token at line 1".to_string());
        assert_eq!(
            err.to_string(),
            "script could not be parsed: unexpected token at line 1"
        );
        assert!(err.is_parse());
        assert!(!ScriptError::Runtime("boom".to_string()).is_parse());
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(ScriptPhase::PreRequest.label(), "Pre-request script");
        assert_eq!(ScriptPhase::PostResponse.event_name(), "test");
    }

    #[test]
    fn test_console_level_from_method() {
        assert_eq!(ConsoleLevel::from_method("warn"), ConsoleLevel::Warn);
        assert_eq!(ConsoleLevel::from_method("trace"), ConsoleLevel::Log);
    }
}
