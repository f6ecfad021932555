// ABOUTME: Lifecycle hooks attached to a managed container.
// ABOUTME: Built-in removal and log persistence plus caller-supplied async closures.

use super::capture::CapturedOutput;
use super::error::{HookPoint, RunnerError};
use crate::engine::EngineClient;
use crate::types::ContainerId;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HookFn = Arc<dyn Fn(ContainerId) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// An action bound to a lifecycle transition of a container.
#[derive(Clone)]
pub enum Hook {
    /// Force-remove the container; a container that is already gone is fine.
    RemoveContainer,
    /// Write captured output to `<dir>/logs/<name>.stdout.log` and `.stderr.log`.
    PersistLogs { dir: PathBuf },
    Custom { name: String, run: HookFn },
}

impl Hook {
    /// Wrap an async closure that receives the live container id.
    pub fn custom<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ContainerId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::Custom {
            name: name.into(),
            run: Arc::new(move |id| f(id).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Hook::RemoveContainer => "remove-container",
            Hook::PersistLogs { .. } => "persist-logs",
            Hook::Custom { name, .. } => name,
        }
    }

    async fn execute(&self, ctx: &HookContext<'_>) -> Result<(), BoxError> {
        match self {
            Hook::RemoveContainer => match ctx.engine.remove_container(ctx.id.as_str(), true).await
            {
                Ok(()) => Ok(()),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(container = ctx.name, "container already removed");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            Hook::PersistLogs { dir } => persist_logs(dir, ctx.name, ctx.output).await,
            Hook::Custom { run, .. } => run(ctx.id.clone()).await,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::RemoveContainer => f.write_str("RemoveContainer"),
            Hook::PersistLogs { dir } => f.debug_struct("PersistLogs").field("dir", dir).finish(),
            Hook::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

/// What a hook can see of the container it runs for.
pub(crate) struct HookContext<'a> {
    pub engine: &'a dyn EngineClient,
    pub id: &'a ContainerId,
    pub name: &'a str,
    pub output: &'a CapturedOutput,
}

/// Run `hooks` in order, stopping at the first failure.
pub(crate) async fn run_hooks(
    hooks: &[Hook],
    point: HookPoint,
    ctx: &HookContext<'_>,
) -> Result<(), RunnerError> {
    for hook in hooks {
        tracing::debug!(hook = hook.name(), %point, container = ctx.name, "running hook");
        hook.execute(ctx).await.map_err(|e| RunnerError::Hook {
            point,
            hook: hook.name().to_string(),
            name: ctx.name.to_string(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

async fn persist_logs(dir: &Path, name: &str, output: &CapturedOutput) -> Result<(), BoxError> {
    if output.is_empty() {
        return Ok(());
    }

    let log_dir = dir.join("logs");
    tokio::fs::create_dir_all(&log_dir).await?;

    for (suffix, bytes) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        if bytes.is_empty() {
            continue;
        }
        let path = log_dir.join(format!("{name}.{suffix}.log"));
        tracing::debug!(path = %path.display(), "writing container log");
        tokio::fs::write(&path, bytes).await?;
    }
    Ok(())
}
