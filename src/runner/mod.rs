// ABOUTME: Container runner: a builder that freezes container settings and runs them once.
// ABOUTME: Streams output, enforces a wait budget, and always runs exit hooks after create.

mod capture;
mod error;
mod hooks;
mod lifecycle;

pub use capture::CapturedOutput;
pub use error::{HookPoint, LifecycleStep, RunnerError};
pub use hooks::{BoxError, Hook, HookFn};

use crate::diagnostics::Warning;
use crate::engine::{ContainerSpec, EngineClient};
use crate::types::{BindMount, ContainerId, ContainerName, ImageRef};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// How long a foreground container may run before it is killed.
pub const DEFAULT_WAIT_BUDGET: Duration = Duration::from_secs(60);

/// Frozen settings of a runner; the container is created from these only.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub entrypoint: Option<Vec<String>>,
    pub command: Option<Vec<String>>,
    pub binds: Vec<BindMount>,
    pub privileged: bool,
    pub host_network: bool,
    pub host_pid: bool,
    pub userns_host: bool,
    pub auto_remove: bool,
    pub background: bool,
    pub on_start: Vec<Hook>,
    pub on_exit: Vec<Hook>,
    pub wait_budget: Duration,
}

impl RunnerConfig {
    pub(crate) fn container_spec(&self, image: &ImageRef, name: &ContainerName) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            image: image.to_string(),
            entrypoint: self.entrypoint.clone(),
            command: self.command.clone(),
            binds: self.binds.clone(),
            privileged: self.privileged,
            host_network: self.host_network,
            host_pid: self.host_pid,
            userns_host: self.userns_host,
            auto_remove: self.auto_remove,
            attach_output: !self.background,
        }
    }
}

/// Accumulates container settings; `build` validates them.
///
/// Every method consumes and returns the builder, so calls chain:
///
/// ```ignore
/// let runner = ContainerRunner::builder(engine)
///     .discard()
///     .host_network()
///     .entrypoint(["hostname"])
///     .command(["-I"])
///     .build()
///     .await?;
/// ```
pub struct RunnerBuilder {
    engine: Arc<dyn EngineClient>,
    entrypoint: Option<Vec<String>>,
    command: Option<Vec<String>>,
    binds: Vec<BindMount>,
    privileged: bool,
    host_network: bool,
    host_pid: bool,
    discard: bool,
    background: bool,
    on_start: Vec<Hook>,
    on_exit: Vec<Hook>,
    log_dir: Option<PathBuf>,
    wait_budget: Duration,
    misuse: Option<String>,
}

impl RunnerBuilder {
    fn new(engine: Arc<dyn EngineClient>) -> Self {
        Self {
            engine,
            entrypoint: None,
            command: None,
            binds: Vec::new(),
            privileged: false,
            host_network: false,
            host_pid: false,
            discard: false,
            background: false,
            on_start: Vec::new(),
            on_exit: Vec::new(),
            log_dir: None,
            wait_budget: DEFAULT_WAIT_BUDGET,
            misuse: None,
        }
    }

    /// Remove the container once it exits.
    pub fn discard(mut self) -> Self {
        self.discard = true;
        self
    }

    /// Run privileged; user namespace support is resolved at `build`.
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn host_pid(mut self) -> Self {
        self.host_pid = true;
        self
    }

    pub fn host_network(mut self) -> Self {
        self.host_network = true;
        self
    }

    pub fn bind(mut self, mount: BindMount) -> Self {
        if !self.binds.contains(&mount) {
            self.binds.push(mount);
        }
        self
    }

    /// Mount the host root filesystem read-only at `/rootfs`.
    pub fn mount_root_fs(self) -> Self {
        self.bind(BindMount::root_fs())
    }

    pub fn entrypoint<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Return right after start and on-start hooks; no output is captured.
    pub fn background(mut self) -> Self {
        self.background = true;
        if !self.on_exit.is_empty() {
            self.flag_misuse("background runner cannot have on-exit hooks");
        }
        self
    }

    pub fn on_start(mut self, hook: Hook) -> Self {
        self.on_start.push(hook);
        self
    }

    pub fn on_exit(mut self, hook: Hook) -> Self {
        if self.background {
            self.flag_misuse("background runner cannot have on-exit hooks");
        }
        self.on_exit.push(hook);
        self
    }

    pub fn wait_budget(mut self, budget: Duration) -> Self {
        self.wait_budget = budget;
        self
    }

    /// Write captured output under `<dir>/logs` once the container exits.
    pub fn persist_logs(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    fn flag_misuse(&mut self, message: &str) {
        if self.misuse.is_none() {
            self.misuse = Some(message.to_string());
        }
    }

    /// Validate and freeze the configuration.
    pub async fn build(self) -> Result<ContainerRunner, RunnerError> {
        if let Some(message) = self.misuse {
            return Err(RunnerError::Configuration(message));
        }
        if self.wait_budget.is_zero() {
            return Err(RunnerError::Configuration(
                "wait budget must be greater than zero".to_string(),
            ));
        }

        let userns_host = if self.privileged {
            let info = self
                .engine
                .info()
                .await
                .map_err(RunnerError::UserNamespace)?;
            info.user_namespace_enabled()
        } else {
            false
        };

        let mut on_exit = self.on_exit;
        if !self.background {
            if let Some(dir) = self.log_dir {
                on_exit.push(Hook::PersistLogs { dir });
            }
            if self.discard {
                on_exit.push(Hook::RemoveContainer);
            }
        }

        let config = RunnerConfig {
            entrypoint: self.entrypoint,
            command: self.command,
            binds: self.binds,
            privileged: self.privileged,
            host_network: self.host_network,
            host_pid: self.host_pid,
            userns_host,
            auto_remove: self.discard,
            background: self.background,
            on_start: self.on_start,
            on_exit,
            wait_budget: self.wait_budget,
        };

        Ok(ContainerRunner {
            engine: self.engine,
            config,
            outcome: Arc::new(OnceCell::new()),
        })
    }
}

/// A validated, single-use container run.
pub struct ContainerRunner {
    engine: Arc<dyn EngineClient>,
    config: RunnerConfig,
    outcome: Arc<OnceCell<RunOutcome>>,
}

impl ContainerRunner {
    pub fn builder(engine: Arc<dyn EngineClient>) -> RunnerBuilder {
        RunnerBuilder::new(engine)
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Create and run the container. Later calls return the first outcome
    /// without touching the engine again.
    ///
    /// The lifecycle runs on its own task. Dropping this future does not
    /// cancel it, so a created container still reaches its exit hooks.
    pub async fn run(&self, image: &ImageRef, name: &ContainerName) -> &RunOutcome {
        if self.outcome.get().is_none() {
            let cell = Arc::clone(&self.outcome);
            let engine = Arc::clone(&self.engine);
            let config = self.config.clone();
            let (image, name) = (image.clone(), name.clone());
            let task = tokio::spawn(async move {
                cell.get_or_init(|| lifecycle::execute(&engine, &config, &image, &name))
                    .await;
            });
            if let Err(e) = task.await
                && e.is_panic()
            {
                std::panic::resume_unwind(e.into_panic());
            }
        }
        self.outcome
            .get_or_init(|| lifecycle::execute(&self.engine, &self.config, image, name))
            .await
    }

    /// Outcome of a previous `run`, if any.
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.get()
    }
}

/// Result of running a container.
#[derive(Debug)]
pub struct RunOutcome {
    container_id: Option<ContainerId>,
    captured: CapturedOutput,
    error: Option<RunnerError>,
    warnings: Vec<Warning>,
    background: bool,
}

impl RunOutcome {
    /// Id of the created container; `None` when create failed.
    pub fn container_id(&self) -> Option<&ContainerId> {
        self.container_id.as_ref()
    }

    /// Trimmed stdout. Always empty for background runs.
    pub fn output(&self) -> String {
        if self.background {
            tracing::debug!("output requested from a background container; nothing was captured");
            return String::new();
        }
        self.captured.stdout_text()
    }

    /// Trimmed stderr. Always empty for background runs.
    pub fn error_output(&self) -> String {
        if self.background {
            tracing::debug!("error output requested from a background container; nothing was captured");
            return String::new();
        }
        self.captured.stderr_text()
    }

    pub fn captured(&self) -> &CapturedOutput {
        &self.captured
    }

    /// First terminal error of the run.
    pub fn error(&self) -> Option<&RunnerError> {
        self.error.as_ref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn result(&self) -> Result<(), RunnerError> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
