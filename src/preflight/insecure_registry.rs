// ABOUTME: Pre-flight check that the engine allows the cluster's registry range as insecure.
// ABOUTME: Reports the ranges that were configured when the required one is missing.

use super::{ValidationError, Validator};
use crate::engine::EngineClient;
use async_trait::async_trait;
use std::sync::Arc;

pub struct InsecureRegistry {
    engine: Arc<dyn EngineClient>,
    cidr: String,
}

impl InsecureRegistry {
    pub fn new(engine: Arc<dyn EngineClient>, cidr: impl Into<String>) -> Self {
        Self {
            engine,
            cidr: cidr.into(),
        }
    }
}

#[async_trait]
impl Validator for InsecureRegistry {
    fn message(&self) -> String {
        format!("Checking insecure registry configuration has {}", self.cidr)
    }

    async fn validate(&self) -> Result<(), ValidationError> {
        let info = self
            .engine
            .info()
            .await
            .map_err(|source| ValidationError::Engine {
                operation: "engine info",
                source,
            })?;

        let found: Vec<&str> = info
            .insecure_registry_cidrs
            .iter()
            .map(|c| c.trim_start_matches('[').trim_end_matches(']'))
            .collect();

        if found.iter().any(|c| c.contains(self.cidr.as_str())) {
            return Ok(());
        }

        Err(ValidationError::InsecureRegistryMissing {
            required: self.cidr.clone(),
            found: found.join(","),
        })
    }
}
