// ABOUTME: Settings file types and parsing for cluster-up.yml.
// ABOUTME: Handles YAML parsing, humantime durations, defaults, and file discovery.

pub mod defaults;
mod deserialize;

use crate::engine::{DEFAULT_CALL_TIMEOUT, EngineKind};
use crate::error::{Error, Result};
use crate::types::ImageRef;
use deserialize::deserialize_no_proxy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use defaults::SETTINGS_FILENAME;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Registry/organisation prefix for the cluster images.
    pub image_prefix: String,

    pub image_tag: String,

    /// Host directory for cluster state; helper-container logs land in `<base_dir>/logs`.
    pub base_dir: Option<PathBuf>,

    pub public_hostname: Option<String>,

    pub engine: EngineSettings,

    pub timeouts: TimeoutSettings,

    pub proxy: Option<ProxySettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_prefix: defaults::DEFAULT_IMAGE_PREFIX.to_string(),
            image_tag: defaults::DEFAULT_IMAGE_TAG.to_string(),
            base_dir: None,
            public_hostname: None,
            engine: EngineSettings::default(),
            timeouts: TimeoutSettings::default(),
            proxy: None,
        }
    }
}

/// Explicit engine endpoint; when absent the endpoint is detected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    #[serde(default)]
    pub kind: Option<EngineKind>,
    #[serde(default)]
    pub socket: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Bound on each individual engine call.
    #[serde(with = "humantime_serde")]
    pub engine_call: Duration,

    /// Bound on waiting for a foreground helper container to exit.
    #[serde(with = "humantime_serde")]
    pub container_wait: Duration,

    /// Bound on the loopback listener probe.
    #[serde(with = "humantime_serde")]
    pub probe: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            engine_call: DEFAULT_CALL_TIMEOUT,
            container_wait: crate::runner::DEFAULT_WAIT_BUDGET,
            probe: crate::network::DEFAULT_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySettings {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default, deserialize_with = "deserialize_no_proxy")]
    pub no_proxy: Vec<String>,
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.origin_image()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SettingsNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `cluster-up.yml` from `dir`, or fall back to defaults when absent.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILENAME);
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading settings");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// The cluster image, `<prefix>/origin:<tag>`; also used for helper containers.
    pub fn origin_image(&self) -> Result<ImageRef> {
        ImageRef::from_parts(
            &self.image_prefix,
            defaults::ORIGIN_IMAGE_NAME,
            &self.image_tag,
        )
        .map_err(|e| Error::InvalidConfig(format!("image: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_yaml("{}").unwrap();
        assert_eq!(settings.image_prefix, "openshift");
        assert_eq!(settings.image_tag, "latest");
        assert_eq!(settings.timeouts.engine_call, Duration::from_secs(10));
        assert_eq!(settings.timeouts.container_wait, Duration::from_secs(60));
        assert_eq!(settings.timeouts.probe, Duration::from_secs(10));
        assert!(settings.proxy.is_none());
    }

    #[test]
    fn origin_image_composes_prefix_and_tag() {
        let settings = Settings::from_yaml("image_prefix: registry.local:5000/ocp\nimage_tag: v3.11\n")
            .unwrap();
        assert_eq!(
            settings.origin_image().unwrap().to_string(),
            "registry.local:5000/ocp/origin:v3.11"
        );
    }

    #[test]
    fn invalid_image_tag_is_rejected() {
        let err = Settings::from_yaml("image_tag: \"bad tag\"\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn no_proxy_accepts_comma_separated_string() {
        let settings = Settings::from_yaml(
            "proxy:\n  http_proxy: http://proxy:3128\n  no_proxy: \"a.local, b.local,,\"\n",
        )
        .unwrap();
        let proxy = settings.proxy.unwrap();
        assert_eq!(proxy.no_proxy, vec!["a.local", "b.local"]);
    }

    #[test]
    fn no_proxy_accepts_list() {
        let settings =
            Settings::from_yaml("proxy:\n  no_proxy:\n    - a.local\n    - b.local,c.local\n")
                .unwrap();
        assert_eq!(
            settings.proxy.unwrap().no_proxy,
            vec!["a.local", "b.local", "c.local"]
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(Settings::from_yaml("routing_suffix: apps.example.com\n").is_err());
    }
}
