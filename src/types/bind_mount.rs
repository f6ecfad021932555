// ABOUTME: Host bind mounts in the engine's "host:container:mode" string format.
// ABOUTME: Parses and renders bind specs; mode defaults to read-write.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindMountError {
    #[error("bind mount must look like host:container[:mode], got {0:?}")]
    InvalidFormat(String),

    #[error("bind mount paths cannot be empty")]
    EmptyPath,

    #[error("unknown bind mount mode {0:?} (expected ro or rw)")]
    InvalidMode(String),
}

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MountMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl MountMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountMode::ReadOnly => "ro",
            MountMode::ReadWrite => "rw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindMount {
    pub host: String,
    pub container: String,
    pub mode: MountMode,
}

impl BindMount {
    pub fn new(host: impl Into<String>, container: impl Into<String>, mode: MountMode) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            mode,
        }
    }

    /// The host root filesystem, read-only at `/rootfs`.
    pub fn root_fs() -> Self {
        Self::new("/", "/rootfs", MountMode::ReadOnly)
    }
}

impl FromStr for BindMount {
    type Err = BindMountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (host, container, mode) = match parts.as_slice() {
            [host, container] => (*host, *container, MountMode::ReadWrite),
            [host, container, "ro"] => (*host, *container, MountMode::ReadOnly),
            [host, container, "rw"] => (*host, *container, MountMode::ReadWrite),
            [_, _, mode] => return Err(BindMountError::InvalidMode((*mode).to_string())),
            _ => return Err(BindMountError::InvalidFormat(s.to_string())),
        };

        if host.is_empty() || container.is_empty() {
            return Err(BindMountError::EmptyPath);
        }

        Ok(Self::new(host, container, mode))
    }
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.host, self.container, self.mode.as_str())
    }
}
