// ABOUTME: Drives one container through create, attach, start, hooks, wait, and cleanup.
// ABOUTME: Records the first terminal error; later failures become warnings.

use super::capture::{CapturedOutput, OutputCapture};
use super::error::{HookPoint, LifecycleStep, RunnerError};
use super::hooks::{HookContext, run_hooks};
use super::{RunOutcome, RunnerConfig};
use crate::diagnostics::{Diagnostics, Warning};
use crate::engine::{EngineClient, EngineError, WaitCondition};
use crate::types::{ContainerId, ContainerName, ImageRef};
use std::sync::Arc;
use std::task::Poll;
use std::time::{Duration, Instant};

/// Bound on reading the remaining output once the container has terminated.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const KILL_SIGNAL: &str = "KILL";

/// Error slot plus warnings accumulated over one run.
#[derive(Default)]
struct RunState {
    error: Option<RunnerError>,
    diagnostics: Diagnostics,
}

impl RunState {
    fn record(&mut self, err: RunnerError) {
        if self.error.is_none() {
            tracing::debug!(error = %err, "run failed");
            self.error = Some(err);
        } else {
            self.diagnostics.warn(Warning::cleanup_failed(err.to_string()));
        }
    }
}

struct Run<'a> {
    engine: &'a Arc<dyn EngineClient>,
    config: &'a RunnerConfig,
    image: String,
    name: &'a str,
    state: RunState,
}

pub(super) async fn execute(
    engine: &Arc<dyn EngineClient>,
    config: &RunnerConfig,
    image: &ImageRef,
    name: &ContainerName,
) -> RunOutcome {
    let mut run = Run {
        engine,
        config,
        image: image.to_string(),
        name: name.as_str(),
        state: RunState::default(),
    };

    let spec = config.container_spec(image, name);
    tracing::debug!(
        container = run.name,
        image = %run.image,
        entrypoint = ?spec.entrypoint,
        command = ?spec.command,
        "creating container"
    );

    let created = match engine.create_container(&spec).await {
        Ok(created) => created,
        Err(source) => {
            let err = run.engine_error(LifecycleStep::Create, source);
            run.state.record(err);
            return run.finish(None, CapturedOutput::default());
        }
    };

    for warning in created.warnings {
        run.state.diagnostics.warn(Warning::engine(format!(
            "container {:?} produced warning: {warning}",
            run.name
        )));
    }

    let id = created.id;
    let captured = if config.background {
        run.background(&id).await;
        CapturedOutput::default()
    } else {
        run.foreground(&id).await
    };

    run.finish(Some(id), captured)
}

impl Run<'_> {
    fn engine_error(&self, step: LifecycleStep, source: EngineError) -> RunnerError {
        RunnerError::Engine {
            name: self.name.to_string(),
            image: self.image.clone(),
            step,
            source,
        }
    }

    fn finish(self, container_id: Option<ContainerId>, captured: CapturedOutput) -> RunOutcome {
        RunOutcome {
            container_id,
            captured,
            error: self.state.error,
            warnings: self.state.diagnostics.into_warnings(),
            background: self.config.background,
        }
    }

    fn context<'b>(&'b self, id: &'b ContainerId, output: &'b CapturedOutput) -> HookContext<'b> {
        HookContext {
            engine: self.engine.as_ref(),
            id,
            name: self.name,
            output,
        }
    }

    async fn background(&mut self, id: &ContainerId) {
        if let Err(source) = self.engine.start_container(id.as_str()).await {
            let err = self.engine_error(LifecycleStep::Start, source);
            self.state.record(err);
            return;
        }
        tracing::debug!(container = self.name, id = %id.short(), "started in background");

        let empty = CapturedOutput::default();
        let result = run_hooks(
            &self.config.on_start,
            HookPoint::OnStart,
            &self.context(id, &empty),
        )
        .await;
        if let Err(err) = result {
            self.state.record(err);
            self.kill(id).await;
        }
    }

    async fn foreground(&mut self, id: &ContainerId) -> CapturedOutput {
        let condition = if self.config.auto_remove {
            WaitCondition::Removed
        } else {
            WaitCondition::NextExit
        };

        let wait_engine = Arc::clone(self.engine);
        let wait_target = id.to_string();
        let mut pending_wait = Box::pin(async move {
            wait_engine.wait_container(&wait_target, condition).await
        });
        // The first poll issues the wait request, before attach and start.
        let mut wait = match futures::poll!(pending_wait.as_mut()) {
            Poll::Ready(result) => tokio::spawn(async move { result }),
            Poll::Pending => tokio::spawn(pending_wait),
        };

        let capture = match self.engine.attach_container(id.as_str()).await {
            Ok(stream) => OutputCapture::spawn(stream),
            Err(source) => {
                wait.abort();
                let err = self.engine_error(LifecycleStep::Attach, source);
                self.state.record(err);
                return self.exit_hooks(id, CapturedOutput::default()).await;
            }
        };

        let started = Instant::now();
        if let Err(source) = self.engine.start_container(id.as_str()).await {
            wait.abort();
            let err = self.engine_error(LifecycleStep::Start, source);
            self.state.record(err);
            let captured = capture.abort();
            return self.exit_hooks(id, captured).await;
        }

        let snapshot = capture.snapshot();
        let result = run_hooks(
            &self.config.on_start,
            HookPoint::OnStart,
            &self.context(id, &snapshot),
        )
        .await;
        if let Err(err) = result {
            wait.abort();
            self.state.record(err);
            self.kill(id).await;
            let captured = capture.finish(OUTPUT_DRAIN_TIMEOUT).await;
            return self.exit_hooks(id, captured).await;
        }

        let budget = self.config.wait_budget;
        let waited = tokio::time::timeout(budget, &mut wait).await;
        if waited.is_err() {
            wait.abort();
            self.state.record(RunnerError::WaitTimeout {
                name: self.name.to_string(),
                budget,
            });
            self.kill(id).await;
            self.force_remove(id).await;
        }

        let captured = capture.finish(OUTPUT_DRAIN_TIMEOUT).await;

        if let Ok(joined) = waited {
            let status = joined.unwrap_or_else(|e| {
                Err(EngineError::Api(format!("wait task failed: {e}")))
            });
            match status {
                Ok(0) => {
                    tracing::debug!(
                        container = self.name,
                        image = %self.image,
                        took_ms = started.elapsed().as_millis() as u64,
                        "container finished"
                    );
                }
                Ok(code) => self.state.record(RunnerError::ExitStatus {
                    name: self.name.to_string(),
                    code,
                    output: captured.combined(),
                }),
                Err(source) => self.state.record(RunnerError::WaitFailed {
                    name: self.name.to_string(),
                    source,
                    output: captured.combined(),
                }),
            }
        }

        self.exit_hooks(id, captured).await
    }

    async fn exit_hooks(&mut self, id: &ContainerId, captured: CapturedOutput) -> CapturedOutput {
        let result = run_hooks(
            &self.config.on_exit,
            HookPoint::OnExit,
            &self.context(id, &captured),
        )
        .await;
        if let Err(err) = result {
            self.state.record(err);
        }
        captured
    }

    async fn kill(&mut self, id: &ContainerId) {
        match self.engine.kill_container(id.as_str(), KILL_SIGNAL).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(source) => {
                let err = self.engine_error(LifecycleStep::Kill, source);
                self.state.record(err);
            }
        }
    }

    async fn force_remove(&mut self, id: &ContainerId) {
        match self.engine.remove_container(id.as_str(), true).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(source) => {
                let err = self.engine_error(LifecycleStep::Remove, source);
                self.state.record(err);
            }
        }
    }
}
