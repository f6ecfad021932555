// ABOUTME: Capability trait for the container engine and the types it exchanges.
// ABOUTME: The runner, probe, and pre-flight checks depend only on this trait.

use super::error::EngineError;
use crate::types::{BindMount, ContainerId};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Security option the engine reports when user namespaces are remapped.
const USERNS_SECURITY_OPTION: &str = "name=userns";

/// Container lifecycle primitives of a Docker-compatible engine.
///
/// Every call is independently bounded by the implementation's call timeout,
/// except [`EngineClient::wait_container`], which callers bound themselves.
/// Targets are container ids or names.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Daemon-wide information (kernel, security options, registry config).
    async fn info(&self) -> Result<EngineInfo, EngineError>;

    /// Version information reported by the daemon.
    async fn server_version(&self) -> Result<ServerVersion, EngineError>;

    async fn create_container(&self, spec: &ContainerSpec)
    -> Result<CreatedContainer, EngineError>;

    async fn start_container(&self, target: &str) -> Result<(), EngineError>;

    /// Attach to the combined stdout/stderr stream of a container.
    async fn attach_container(&self, target: &str) -> Result<OutputStream, EngineError>;

    /// Block until the container reaches `condition`, returning its exit code.
    async fn wait_container(
        &self,
        target: &str,
        condition: WaitCondition,
    ) -> Result<i64, EngineError>;

    async fn kill_container(&self, target: &str, signal: &str) -> Result<(), EngineError>;

    async fn remove_container(&self, target: &str, force: bool) -> Result<(), EngineError>;

    async fn inspect_container(&self, target: &str) -> Result<ContainerInspection, EngineError>;
}

/// Demultiplexed output of an attached container.
pub type OutputStream = Pin<Box<dyn Stream<Item = Result<OutputChunk, EngineError>> + Send>>;

/// One frame of attached output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(Bytes),
    Stderr(Bytes),
}

/// What to wait for in [`EngineClient::wait_container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    NotRunning,
    NextExit,
    Removed,
}

impl WaitCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitCondition::NotRunning => "not-running",
            WaitCondition::NextExit => "next-exit",
            WaitCondition::Removed => "removed",
        }
    }
}

/// Everything needed to create a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub entrypoint: Option<Vec<String>>,
    pub command: Option<Vec<String>>,
    pub binds: Vec<BindMount>,
    pub privileged: bool,
    pub host_network: bool,
    pub host_pid: bool,
    /// Run in the host user namespace (needed for privileged containers when
    /// the daemon remaps user namespaces).
    pub userns_host: bool,
    pub auto_remove: bool,
    /// Attach stdout and stderr so they can be streamed.
    pub attach_output: bool,
}

/// Response to a successful create.
#[derive(Debug, Clone)]
pub struct CreatedContainer {
    pub id: ContainerId,
    pub warnings: Vec<String>,
}

/// Subset of daemon info the core needs.
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub kernel_version: Option<String>,
    pub security_options: Vec<String>,
    pub insecure_registry_cidrs: Vec<String>,
}

impl EngineInfo {
    pub fn user_namespace_enabled(&self) -> bool {
        self.security_options
            .iter()
            .any(|opt| opt == USERNS_SECURITY_OPTION)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerVersion {
    pub api_version: String,
    pub version: String,
}

/// State of an existing container.
#[derive(Debug, Clone)]
pub struct ContainerInspection {
    pub id: ContainerId,
    pub name: String,
    pub running: bool,
    pub status: String,
}
