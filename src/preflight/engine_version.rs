// ABOUTME: Pre-flight check that the engine speaks a recent enough API version.
// ABOUTME: Compares versions numerically, so 1.9 is older than 1.22.

use super::{ValidationError, Validator};
use crate::engine::EngineClient;
use crate::types::ApiVersion;
use async_trait::async_trait;
use std::sync::Arc;

pub struct EngineVersion {
    engine: Arc<dyn EngineClient>,
    minimum: ApiVersion,
}

impl EngineVersion {
    pub fn new(engine: Arc<dyn EngineClient>, minimum: ApiVersion) -> Self {
        Self { engine, minimum }
    }
}

#[async_trait]
impl Validator for EngineVersion {
    fn message(&self) -> String {
        format!(
            "Checking if the container engine API version is >= {}",
            self.minimum
        )
    }

    async fn validate(&self) -> Result<(), ValidationError> {
        let version = self
            .engine
            .server_version()
            .await
            .map_err(|source| ValidationError::Engine {
                operation: "server version",
                source,
            })?;

        let actual = ApiVersion::parse(&version.api_version).map_err(|source| {
            ValidationError::InvalidVersion {
                raw: version.api_version.clone(),
                source,
            }
        })?;

        if actual < self.minimum {
            return Err(ValidationError::VersionTooOld {
                required: self.minimum.clone(),
                actual,
            });
        }

        tracing::debug!(api_version = %actual, version = %version.version, "engine version is supported");
        Ok(())
    }
}
