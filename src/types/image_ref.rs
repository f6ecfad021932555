// ABOUTME: Container image reference parsing and composition.
// ABOUTME: Handles repository[:tag] with optional registry host and port.

use std::fmt;
use thiserror::Error;

const DEFAULT_TAG: &str = "latest";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// An image to run, always carrying an explicit tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    repository: String,
    tag: String,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_'))
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        // A colon after the last slash separates the tag; earlier colons belong
        // to a registry port.
        let last_slash = input.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match input[last_slash..].split_once(':') {
            Some((name, tag)) => (&input[..last_slash + name.len()], tag),
            None => (input, DEFAULT_TAG),
        };

        if repository.is_empty()
            || tag.is_empty()
            || repository.ends_with('/')
            || repository.starts_with('/')
            || repository.contains("//")
        {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Compose `prefix/name:tag`, e.g. `openshift` + `origin` + `v3.11`.
    pub fn from_parts(prefix: &str, name: &str, tag: &str) -> Result<Self, ParseImageRefError> {
        let prefix = prefix.trim_end_matches('/');
        let joined = if prefix.is_empty() {
            format!("{name}:{tag}")
        } else {
            format!("{prefix}/{name}:{tag}")
        };
        Self::parse(&joined)
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
