// ABOUTME: Background capture of an attached container's stdout and stderr.
// ABOUTME: A spawned task fills two buffers; the runner drains it with a bounded wait.

use crate::engine::{OutputChunk, OutputStream};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Output collected from a foreground container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Trimmed stdout followed by trimmed stderr, skipping whichever is empty.
    pub fn combined(&self) -> String {
        let parts = [self.stdout_text(), self.stderr_text()];
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

pub(crate) struct OutputCapture {
    buffers: Arc<Mutex<CapturedOutput>>,
    task: JoinHandle<()>,
}

impl OutputCapture {
    pub(crate) fn spawn(mut stream: OutputStream) -> Self {
        let buffers = Arc::new(Mutex::new(CapturedOutput::default()));
        let sink = Arc::clone(&buffers);

        let task = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(OutputChunk::Stdout(bytes)) => sink.lock().stdout.extend_from_slice(&bytes),
                    Ok(OutputChunk::Stderr(bytes)) => sink.lock().stderr.extend_from_slice(&bytes),
                    Err(e) => {
                        tracing::debug!(error = %e, "container output stream ended with error");
                        break;
                    }
                }
            }
        });

        Self { buffers, task }
    }

    /// What has been captured so far.
    pub(crate) fn snapshot(&self) -> CapturedOutput {
        self.buffers.lock().clone()
    }

    /// Wait up to `drain` for the stream to end, then return everything captured.
    pub(crate) async fn finish(mut self, drain: Duration) -> CapturedOutput {
        if tokio::time::timeout(drain, &mut self.task).await.is_err() {
            tracing::debug!(
                drain_secs = drain.as_secs(),
                "output stream still open after drain timeout"
            );
            self.task.abort();
        }
        self.snapshot()
    }

    /// Stop capturing immediately.
    pub(crate) fn abort(self) -> CapturedOutput {
        self.task.abort();
        self.snapshot()
    }
}
