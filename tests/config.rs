// ABOUTME: Integration tests for settings files and engine endpoint detection.
// ABOUTME: Covers discovery, missing files, full documents, and DOCKER_HOST handling.

use cluster_up::config::{EngineSettings, Settings};
use cluster_up::engine::{EngineKind, detect_local};
use cluster_up::error::Error;
use std::fs;
use std::time::Duration;

mod settings_files {
    use super::*;

    #[test]
    fn full_document_parses() {
        let yaml = r#"
image_prefix: registry.local:5000/openshift
image_tag: v3.11
base_dir: /var/lib/cluster
public_hostname: 192.168.99.100

engine:
  kind: podman
  socket: /run/user/1000/podman/podman.sock

timeouts:
  engine_call: 5s
  container_wait: 2m
  probe: 15s

proxy:
  http_proxy: http://proxy.corp:3128
  https_proxy: http://proxy.corp:3129
  no_proxy: .corp,.svc
"#;
        let settings = Settings::from_yaml(yaml).unwrap();

        assert_eq!(
            settings.origin_image().unwrap().to_string(),
            "registry.local:5000/openshift/origin:v3.11"
        );
        assert_eq!(settings.public_hostname.as_deref(), Some("192.168.99.100"));
        assert_eq!(settings.engine.kind, Some(EngineKind::Podman));
        assert_eq!(settings.timeouts.engine_call, Duration::from_secs(5));
        assert_eq!(settings.timeouts.container_wait, Duration::from_secs(120));
        assert_eq!(settings.timeouts.probe, Duration::from_secs(15));

        let proxy = settings.proxy.unwrap();
        assert_eq!(proxy.https_proxy.as_deref(), Some("http://proxy.corp:3129"));
        assert_eq!(proxy.no_proxy, vec![".corp", ".svc"]);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yml");

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, Error::SettingsNotFound(ref p) if p == &path));
        assert!(err.to_string().starts_with("settings file not found"));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::discover(dir.path()).unwrap();

        assert_eq!(settings.image_prefix, "openshift");
        assert_eq!(settings.image_tag, "latest");
        assert!(settings.base_dir.is_none());
    }

    #[test]
    fn discover_reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cluster-up.yml"), "image_tag: v3.10\n").unwrap();

        let settings = Settings::discover(dir.path()).unwrap();
        assert_eq!(settings.image_tag, "v3.10");
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster-up.yml");
        fs::write(&path, "timeouts: [not, a, map]\n").unwrap();

        assert!(matches!(Settings::load(&path), Err(Error::Yaml(_))));
    }
}

mod detection {
    use super::*;

    #[test]
    fn docker_host_is_honored() {
        temp_env::with_var("DOCKER_HOST", Some("tcp://10.0.0.2:2375"), || {
            let endpoint = detect_local(None).unwrap();
            assert_eq!(endpoint.kind, EngineKind::Docker);
            assert_eq!(endpoint.address, "tcp://10.0.0.2:2375");
        });
    }

    #[test]
    fn explicit_socket_beats_docker_host() {
        temp_env::with_var("DOCKER_HOST", Some("tcp://10.0.0.2:2375"), || {
            let settings = EngineSettings {
                kind: Some(EngineKind::Podman),
                socket: Some("/tmp/podman.sock".to_string()),
            };
            let endpoint = detect_local(Some(&settings)).unwrap();
            assert_eq!(endpoint.kind, EngineKind::Podman);
            assert_eq!(endpoint.address, "/tmp/podman.sock");
        });
    }
}
