// ABOUTME: Bollard-backed engine client speaking the Docker-compatible HTTP API.
// ABOUTME: Bounds each call with a timeout and maps daemon status codes to EngineError.

use super::client::{
    ContainerInspection, ContainerSpec, CreatedContainer, EngineClient, EngineInfo, OutputChunk,
    OutputStream, ServerVersion, WaitCondition,
};
use super::detection::EngineEndpoint;
use super::error::EngineError;
use crate::types::ContainerId;
use async_trait::async_trait;
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    AttachContainerOptionsBuilder, CreateContainerOptions, InspectContainerOptions,
    KillContainerOptionsBuilder, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptionsBuilder,
};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;

/// Default bound for a single engine call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Socket-level timeout handed to bollard, in seconds.
const CLIENT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_error(e: bollard::errors::Error) -> EngineError {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(message),
        bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message,
        } => EngineError::Conflict(message),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Api(format!("{message} (status {status_code})")),
        other => EngineError::Api(other.to_string()),
    }
}

fn map_stream_error(e: bollard::errors::Error) -> EngineError {
    EngineError::Stream(e.to_string())
}

// =============================================================================
// BollardEngine
// =============================================================================

/// Engine client over a bollard `Docker` handle.
///
/// Works against Docker and Podman alike through the Docker-compatible API.
pub struct BollardEngine {
    client: Docker,
    call_timeout: Duration,
}

impl BollardEngine {
    pub fn new(client: Docker) -> Self {
        Self {
            client,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Connect to a detected endpoint and negotiate the API version.
    ///
    /// `tcp://` and `http://` addresses use plain HTTP; anything else is treated
    /// as a unix socket path, with or without the `unix://` scheme.
    pub async fn connect(endpoint: &EngineEndpoint) -> Result<Self, EngineError> {
        let address = endpoint.address.as_str();
        let client = if let Some(rest) = address.strip_prefix("tcp://") {
            Docker::connect_with_http(
                &format!("http://{rest}"),
                CLIENT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            )
        } else if address.starts_with("http://") {
            Docker::connect_with_http(address, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        } else {
            let path = address.strip_prefix("unix://").unwrap_or(address);
            Docker::connect_with_unix(path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
        }
        .map_err(|e| EngineError::Connection(format!("{address}: {e}")))?;

        let client = tokio::time::timeout(DEFAULT_CALL_TIMEOUT, client.negotiate_version())
            .await
            .map_err(|_| EngineError::Timeout {
                operation: "negotiate version",
                timeout: DEFAULT_CALL_TIMEOUT,
            })?
            .map_err(|e| EngineError::Connection(format!("{address}: {e}")))?;

        tracing::debug!(address, kind = %endpoint.kind, "connected to container engine");
        Ok(Self::new(client))
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, bollard::errors::Error>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(map_error),
            Err(_) => Err(EngineError::Timeout {
                operation,
                timeout: self.call_timeout,
            }),
        }
    }
}

fn create_body(spec: &ContainerSpec) -> ContainerCreateBody {
    let binds: Vec<String> = spec.binds.iter().map(|b| b.to_string()).collect();

    let host_config = HostConfig {
        binds: if binds.is_empty() { None } else { Some(binds) },
        privileged: Some(spec.privileged),
        network_mode: spec.host_network.then(|| "host".to_string()),
        pid_mode: spec.host_pid.then(|| "host".to_string()),
        userns_mode: spec.userns_host.then(|| "host".to_string()),
        auto_remove: Some(spec.auto_remove),
        ..Default::default()
    };

    ContainerCreateBody {
        image: Some(spec.image.clone()),
        entrypoint: spec.entrypoint.clone(),
        cmd: spec.command.clone(),
        attach_stdout: Some(spec.attach_output),
        attach_stderr: Some(spec.attach_output),
        host_config: Some(host_config),
        ..Default::default()
    }
}

#[async_trait]
impl EngineClient for BollardEngine {
    async fn info(&self) -> Result<EngineInfo, EngineError> {
        let info = self.bounded("info", self.client.info()).await?;

        Ok(EngineInfo {
            kernel_version: info.kernel_version,
            security_options: info.security_options.unwrap_or_default(),
            insecure_registry_cidrs: info
                .registry_config
                .and_then(|r| r.insecure_registry_cidrs)
                .unwrap_or_default(),
        })
    }

    async fn server_version(&self) -> Result<ServerVersion, EngineError> {
        let version = self.bounded("version", self.client.version()).await?;

        Ok(ServerVersion {
            api_version: version.api_version.unwrap_or_default(),
            version: version.version.unwrap_or_default(),
        })
    }

    async fn create_container(
        &self,
        spec: &ContainerSpec,
    ) -> Result<CreatedContainer, EngineError> {
        let opts = CreateContainerOptions {
            name: Some(spec.name.clone()),
            ..Default::default()
        };

        let response = self
            .bounded(
                "create container",
                self.client.create_container(Some(opts), create_body(spec)),
            )
            .await?;

        Ok(CreatedContainer {
            id: ContainerId::new(response.id),
            warnings: response.warnings,
        })
    }

    async fn start_container(&self, target: &str) -> Result<(), EngineError> {
        self.bounded(
            "start container",
            self.client
                .start_container(target, None::<StartContainerOptions>),
        )
        .await
    }

    async fn attach_container(&self, target: &str) -> Result<OutputStream, EngineError> {
        let opts = AttachContainerOptionsBuilder::default()
            .stdout(true)
            .stderr(true)
            .stream(true)
            .logs(true)
            .build();

        let attached = self
            .bounded(
                "attach container",
                self.client.attach_container(target, Some(opts)),
            )
            .await?;

        // The input half must outlive the output stream or the daemon may
        // close the hijacked connection.
        let input = attached.input;
        let stream = attached.output.filter_map(move |frame| {
            let _keep_open = &input;
            let chunk = match frame {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                    Some(Ok(OutputChunk::Stdout(message)))
                }
                Ok(LogOutput::StdErr { message }) => Some(Ok(OutputChunk::Stderr(message))),
                Ok(LogOutput::StdIn { .. }) => None,
                Err(e) => Some(Err(map_stream_error(e))),
            };
            futures::future::ready(chunk)
        });

        Ok(Box::pin(stream))
    }

    async fn wait_container(
        &self,
        target: &str,
        condition: WaitCondition,
    ) -> Result<i64, EngineError> {
        let opts = WaitContainerOptionsBuilder::default()
            .condition(condition.as_str())
            .build();

        let mut stream = self.client.wait_container(target, Some(opts));
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(map_error(e)),
            None => Err(EngineError::Stream(format!(
                "wait stream for {target} ended without a status"
            ))),
        }
    }

    async fn kill_container(&self, target: &str, signal: &str) -> Result<(), EngineError> {
        let opts = KillContainerOptionsBuilder::default().signal(signal).build();

        self.bounded(
            "kill container",
            self.client.kill_container(target, Some(opts)),
        )
        .await
    }

    async fn remove_container(&self, target: &str, force: bool) -> Result<(), EngineError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.bounded(
            "remove container",
            self.client.remove_container(target, Some(opts)),
        )
        .await
    }

    async fn inspect_container(&self, target: &str) -> Result<ContainerInspection, EngineError> {
        let details = self
            .bounded(
                "inspect container",
                self.client
                    .inspect_container(target, None::<InspectContainerOptions>),
            )
            .await?;

        let state = details.state.unwrap_or_default();
        Ok(ContainerInspection {
            id: ContainerId::new(details.id.unwrap_or_default()),
            name: details
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            running: state.running.unwrap_or(false),
            status: state.status.map(|s| s.to_string()).unwrap_or_default(),
        })
    }
}
