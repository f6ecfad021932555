// ABOUTME: Dotted engine API version with numeric, component-wise ordering.
// ABOUTME: "1.9" sorts below "1.22", and "1.22" equals "1.22.0".

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseApiVersionError {
    #[error("API version cannot be empty")]
    Empty,

    #[error("invalid API version component {0:?}")]
    InvalidComponent(String),
}

/// An engine API version such as `1.41`.
#[derive(Debug, Clone)]
pub struct ApiVersion {
    raw: String,
    components: Vec<u64>,
}

impl ApiVersion {
    pub fn parse(input: &str) -> Result<Self, ParseApiVersionError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ParseApiVersionError::Empty);
        }

        let components = raw
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| ParseApiVersionError::InvalidComponent(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }

    /// Build from numeric components, e.g. `[1, 22]`.
    pub fn from_components(components: &[u64]) -> Self {
        let raw = components
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw,
            components: components.to_vec(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn component(&self, idx: usize) -> u64 {
        self.components.get(idx).copied().unwrap_or(0)
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|idx| self.component(idx).cmp(&other.component(idx)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl FromStr for ApiVersion {
    type Err = ParseApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
