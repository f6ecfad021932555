// ABOUTME: Pre-flight check that a helper binary is installed on the client host.
// ABOUTME: Looks the binary up on PATH and runs it with -V.

use super::{ValidationError, Validator};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LocalBinary {
    binary: String,
    search_path: Option<OsString>,
}

impl LocalBinary {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            search_path: None,
        }
    }

    /// Search `path` instead of the process `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn locate(&self) -> Option<PathBuf> {
        if self.binary.contains('/') {
            let candidate = PathBuf::from(&self.binary);
            return is_executable(&candidate).then_some(candidate);
        }

        let path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))?;
        std::env::split_paths(&path)
            .map(|dir| dir.join(&self.binary))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[async_trait]
impl Validator for LocalBinary {
    fn message(&self) -> String {
        format!("Checking if '{}' binary is available", self.binary)
    }

    async fn validate(&self) -> Result<(), ValidationError> {
        let path = self.locate().ok_or_else(|| ValidationError::BinaryNotFound {
            binary: self.binary.clone(),
        })?;

        let failed = |output: String, reason: String| ValidationError::BinaryFailed {
            binary: self.binary.clone(),
            output,
            reason,
        };

        let run = Command::new(&path).arg("-V").kill_on_drop(true).output();
        let output = match tokio::time::timeout(VERSION_TIMEOUT, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(failed(String::new(), e.to_string())),
            Err(_) => {
                return Err(failed(
                    String::new(),
                    format!("no exit within {}s", VERSION_TIMEOUT.as_secs()),
                ));
            }
        };

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(failed(combined.trim().to_string(), output.status.to_string()));
        }

        tracing::debug!(path = %path.display(), "helper binary is available");
        Ok(())
    }
}
