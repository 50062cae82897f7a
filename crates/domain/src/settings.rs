//! Runtime settings.
//!
//! Every field has a serde default so partial configuration files load.

use serde::{Deserialize, Serialize};

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Batch runner behaviour.
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Script sandbox limits.
    #[serde(default)]
    pub scripting: ScriptingSettings,
    /// HTTP adapter behaviour.
    #[serde(default)]
    pub http: HttpSettings,
}

/// Batch runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Iterations when no data rows are supplied.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Pause between consecutive requests.
    #[serde(default)]
    pub delay_between_requests_ms: u64,
    /// Write the environment scope back after a run.
    #[serde(default = "default_true")]
    pub persist_environment: bool,
}

const fn default_iterations() -> usize {
    1
}

const fn default_true() -> bool {
    true
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            delay_between_requests_ms: 0,
            persist_environment: default_true(),
        }
    }
}

/// Script sandbox settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptingSettings {
    /// Maximum iterations of any single loop.
    #[serde(default = "default_loop_iteration_limit")]
    pub loop_iteration_limit: u64,
    /// Maximum call depth.
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    /// Mirror script console output into the log.
    #[serde(default)]
    pub echo_console: bool,
}

const fn default_loop_iteration_limit() -> u64 {
    1_000_000
}

const fn default_recursion_limit() -> usize {
    512
}

impl Default for ScriptingSettings {
    fn default() -> Self {
        Self {
            loop_iteration_limit: default_loop_iteration_limit(),
            recursion_limit: default_recursion_limit(),
            echo_console: false,
        }
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Whole-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bodies above this size go to temporary storage.
    #[serde(default = "default_max_inline_body_bytes")]
    pub max_inline_body_bytes: u64,
    /// `User-Agent` sent when the request sets none.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_max_inline_body_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_user_agent() -> String {
    concat!("courier/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_inline_body_bytes: default_max_inline_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}
