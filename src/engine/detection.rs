// ABOUTME: Locates the local container engine endpoint.
// ABOUTME: Honors explicit settings and DOCKER_HOST, then probes Docker and Podman sockets.

use crate::config::EngineSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";

/// Error during engine detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container engine found (checked DOCKER_HOST, Docker and Podman sockets)")]
    NoEngineFound,
}

/// Which engine flavor sits behind an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Docker,
    Podman,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Docker => write!(f, "docker"),
            EngineKind::Podman => write!(f, "podman"),
        }
    }
}

/// Where to reach the engine: a unix socket path or a `tcp://` / `unix://` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoint {
    pub kind: EngineKind,
    pub address: String,
}

/// Detect the engine endpoint on the local system.
///
/// Detection order:
/// 1. Explicit `engine` settings
/// 2. `DOCKER_HOST`
/// 3. Docker socket (`/var/run/docker.sock`)
/// 4. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 5. Rootful Podman socket (`/run/podman/podman.sock`)
pub fn detect_local(settings: Option<&EngineSettings>) -> Result<EngineEndpoint, DetectionError> {
    detect_with(
        settings,
        std::env::var("DOCKER_HOST").ok(),
        get_uid(),
        |p| p.exists(),
    )
}

fn detect_with(
    settings: Option<&EngineSettings>,
    docker_host: Option<String>,
    uid: Option<String>,
    exists: impl Fn(&Path) -> bool,
) -> Result<EngineEndpoint, DetectionError> {
    if let Some(cfg) = settings {
        if let Some(socket) = &cfg.socket {
            return Ok(EngineEndpoint {
                kind: cfg.kind.unwrap_or_default(),
                address: socket.clone(),
            });
        }
        if let Some(kind) = cfg.kind {
            return Ok(EngineEndpoint {
                kind,
                address: default_socket_path(kind).to_string(),
            });
        }
    }

    if let Some(host) = docker_host.filter(|h| !h.trim().is_empty()) {
        return Ok(EngineEndpoint {
            kind: EngineKind::Docker,
            address: host,
        });
    }

    if exists(Path::new(DOCKER_SOCKET)) {
        return Ok(EngineEndpoint {
            kind: EngineKind::Docker,
            address: DOCKER_SOCKET.to_string(),
        });
    }

    if let Some(uid) = uid {
        let rootless_socket = format!("/run/user/{uid}/podman/podman.sock");
        if exists(Path::new(&rootless_socket)) {
            return Ok(EngineEndpoint {
                kind: EngineKind::Podman,
                address: rootless_socket,
            });
        }
    }

    if exists(Path::new(ROOTFUL_PODMAN)) {
        return Ok(EngineEndpoint {
            kind: EngineKind::Podman,
            address: ROOTFUL_PODMAN.to_string(),
        });
    }

    Err(DetectionError::NoEngineFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(kind: EngineKind) -> &'static str {
    match kind {
        EngineKind::Docker => DOCKER_SOCKET,
        EngineKind::Podman => ROOTFUL_PODMAN,
    }
}
