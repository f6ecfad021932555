// ABOUTME: Errors produced while configuring or running a managed container.
// ABOUTME: Distinguishes misuse, engine failures, exit status, wait timeouts, and hook failures.

use crate::engine::EngineError;
use std::fmt;
use std::time::Duration;

/// Lifecycle step an engine failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    Create,
    Attach,
    Start,
    Kill,
    Remove,
}

impl fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            LifecycleStep::Create => "create",
            LifecycleStep::Attach => "attach",
            LifecycleStep::Start => "start",
            LifecycleStep::Kill => "kill",
            LifecycleStep::Remove => "remove",
        };
        f.write_str(step)
    }
}

/// When a hook runs relative to the container lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    OnStart,
    OnExit,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPoint::OnStart => f.write_str("on-start"),
            HookPoint::OnExit => f.write_str("on-exit"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RunnerError {
    #[error("invalid runner configuration: {0}")]
    Configuration(String),

    #[error("unable to check user namespace support: {0}")]
    UserNamespace(#[source] EngineError),

    #[error("failed to {step} container {name:?} ({image}): {source}")]
    Engine {
        name: String,
        image: String,
        step: LifecycleStep,
        source: EngineError,
    },

    #[error("container {name:?} exited with {code}{}", output_suffix(.output))]
    ExitStatus {
        name: String,
        code: i64,
        output: String,
    },

    #[error("container {name:?} failed to finish: {source}{}", output_suffix(.output))]
    WaitFailed {
        name: String,
        source: EngineError,
        output: String,
    },

    #[error("container {name:?} did not finish within {}s", .budget.as_secs())]
    WaitTimeout { name: String, budget: Duration },

    #[error("{point} hook {hook:?} for container {name:?} failed: {message}")]
    Hook {
        point: HookPoint,
        hook: String,
        name: String,
        message: String,
    },
}

impl RunnerError {
    /// Output the container produced before failing, if the error carries any.
    pub fn output(&self) -> Option<&str> {
        match self {
            RunnerError::ExitStatus { output, .. } | RunnerError::WaitFailed { output, .. } => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}

fn output_suffix(output: &str) -> String {
    if output.is_empty() {
        String::new()
    } else {
        format!(":\n{output}")
    }
}
