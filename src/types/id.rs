// ABOUTME: Engine-assigned container identifier.
// ABOUTME: Keeps ids returned by the engine apart from user-chosen container names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the abbreviated id the engine CLI prints.
const SHORT_ID_LEN: usize = 12;

/// Identifier the engine returned when a container was created.
///
/// Engine calls accept either an id or a name, so this type only guards against
/// mixing up "the container we created" with arbitrary strings in our own code.
#[must_use = "container ids reference engine resources and should not be ignored"]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
