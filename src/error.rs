// ABOUTME: Application-wide error types for cluster-up.
// ABOUTME: Wraps module errors so the binary reports every failure the same way.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("settings file not found: {0}")]
    SettingsNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Detection(#[from] crate::engine::DetectionError),

    #[error("container engine: {0}")]
    Engine(#[from] crate::engine::EngineError),

    #[error(transparent)]
    Preflight(#[from] crate::preflight::PreflightError),

    #[error(transparent)]
    Network(#[from] crate::network::NetworkError),
}

pub type Result<T> = std::result::Result<T, Error>;
