// ABOUTME: Ordered pre-flight checks run before the cluster container is launched.
// ABOUTME: Every check runs; failures are aggregated into a single error.

mod engine_version;
mod insecure_registry;
mod local_binary;
mod stale_container;

pub use engine_version::EngineVersion;
pub use insecure_registry::InsecureRegistry;
pub use local_binary::LocalBinary;
pub use stale_container::StaleContainer;

use crate::config::defaults;
use crate::engine::{EngineClient, EngineError};
use crate::types::{ApiVersion, ParseApiVersionError};
use async_trait::async_trait;
use nonempty::NonEmpty;
use std::sync::Arc;

/// A single environment check.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Human description logged before the check runs.
    fn message(&self) -> String;

    async fn validate(&self) -> Result<(), ValidationError>;
}

/// Why a single check failed.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{operation}: {source}")]
    Engine {
        operation: &'static str,
        source: EngineError,
    },

    #[error("cannot parse engine API version {raw:?}: {source}")]
    InvalidVersion {
        raw: String,
        source: ParseApiVersionError,
    },

    #[error("insufficient engine API version, required >={required}, have {actual}")]
    VersionTooOld {
        required: ApiVersion,
        actual: ApiVersion,
    },

    #[error("insecure registry {required:?} must be configured in the engine (found: {found:?})")]
    InsecureRegistryMissing { required: String, found: String },

    #[error("found existing running container {0:?}")]
    ContainerRunning(String),

    #[error("'{binary}' binary not found in PATH")]
    BinaryNotFound { binary: String },

    #[error("error executing '{binary}' binary: {output} ({reason})")]
    BinaryFailed {
        binary: String,
        output: String,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("validation failed with {count} errors:\n{}", .messages.join("\n"))]
    Failed { count: usize, messages: Vec<String> },
}

/// Which checks to include and what they check against.
#[derive(Debug, Clone)]
pub struct PreflightOptions {
    pub port_forward: bool,
    pub skip_registry_check: bool,
    pub min_api_version: ApiVersion,
    pub insecure_registry: String,
    pub workload_container: String,
    pub helper_binary: String,
}

impl Default for PreflightOptions {
    fn default() -> Self {
        Self {
            port_forward: false,
            skip_registry_check: false,
            min_api_version: ApiVersion::from_components(defaults::MIN_API_VERSION),
            insecure_registry: defaults::INSECURE_REGISTRY_CIDR.to_string(),
            workload_container: defaults::WORKLOAD_CONTAINER.to_string(),
            helper_binary: defaults::HELPER_BINARY.to_string(),
        }
    }
}

/// Non-empty, ordered list of checks.
pub struct ValidatorChain {
    validators: NonEmpty<Box<dyn Validator>>,
}

impl ValidatorChain {
    /// Engine version, registry (unless skipped), stale container, then the
    /// local helper binary when ports are forwarded.
    pub fn new(engine: Arc<dyn EngineClient>, options: &PreflightOptions) -> Self {
        let version: Box<dyn Validator> = Box::new(EngineVersion::new(
            Arc::clone(&engine),
            options.min_api_version.clone(),
        ));
        let mut chain = Self::from_validators(NonEmpty::new(version));

        if !options.skip_registry_check {
            chain.add(Box::new(InsecureRegistry::new(
                Arc::clone(&engine),
                options.insecure_registry.clone(),
            )));
        }

        chain.add(Box::new(StaleContainer::new(
            engine,
            options.workload_container.clone(),
        )));

        if options.port_forward {
            chain.add(Box::new(LocalBinary::new(options.helper_binary.clone())));
        }

        chain
    }

    pub fn from_validators(validators: NonEmpty<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    pub fn add(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// A chain always holds at least one check.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Messages of all checks, in run order.
    pub fn messages(&self) -> Vec<String> {
        self.validators.iter().map(|v| v.message()).collect()
    }

    /// Run every check in order and aggregate the failures.
    pub async fn validate(&self) -> Result<(), PreflightError> {
        let mut messages = Vec::new();

        for validator in self.validators.iter() {
            tracing::info!("--> {}", validator.message());
            if let Err(e) = validator.validate().await {
                tracing::debug!(error = %e, "pre-flight check failed");
                messages.push(e.to_string());
            }
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(PreflightError::Failed {
                count: messages.len(),
                messages,
            })
        }
    }
}
