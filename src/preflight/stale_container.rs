// ABOUTME: Pre-flight check for a leftover cluster container from an earlier run.
// ABOUTME: Removes it when stopped; fails when it is still running.

use super::{ValidationError, Validator};
use crate::engine::EngineClient;
use async_trait::async_trait;
use std::sync::Arc;

pub struct StaleContainer {
    engine: Arc<dyn EngineClient>,
    name: String,
}

impl StaleContainer {
    pub fn new(engine: Arc<dyn EngineClient>, name: impl Into<String>) -> Self {
        Self {
            engine,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Validator for StaleContainer {
    fn message(&self) -> String {
        format!("Checking for an existing {:?} container", self.name)
    }

    async fn validate(&self) -> Result<(), ValidationError> {
        let container = match self.engine.inspect_container(&self.name).await {
            Ok(container) => container,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(source) => {
                return Err(ValidationError::Engine {
                    operation: "container inspect",
                    source,
                });
            }
        };

        if container.running {
            return Err(ValidationError::ContainerRunning(self.name.clone()));
        }

        tracing::debug!(
            id = %container.id.short(),
            status = %container.status,
            "found stopped {:?} container, removing it",
            self.name
        );
        if let Err(e) = self
            .engine
            .remove_container(container.id.as_str(), true)
            .await
        {
            tracing::error!(container = %self.name, error = %e, "removing stale container failed");
        }
        Ok(())
    }
}
