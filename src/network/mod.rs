// ABOUTME: Derives the host networking configuration for the cluster.
// ABOUTME: Chooses the server IP, enumerates additional host IPs, and completes proxy settings.

mod probe;

pub use probe::{
    DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT, DialPolicy, ENUMERATE_CONTAINER,
    LISTENER_CONTAINER, ProbeError, ProbeErrorKind, ProbeSettings, wait_for_successful_dial,
};

use crate::config::defaults::REGISTRY_CLUSTER_IP;
use crate::engine::EngineClient;
use crate::runner::{ContainerRunner, RunnerError};
use crate::types::{ContainerName, ImageRef};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("determining the host IP failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("listing additional host IPs failed: {0}")]
    AdditionalIps(#[source] RunnerError),
}

/// Proxy settings passed to the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyConfig {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Vec<String>,
}

/// Inputs for [`NetworkConfig::build`].
#[derive(Debug, Clone)]
pub struct NetworkOptions {
    pub public_hostname: Option<String>,
    /// Ports are forwarded from the client, so the server is always loopback.
    pub port_forward: bool,
    pub proxy: Option<ProxyConfig>,
    pub probe: ProbeSettings,
    /// Image for the helper containers.
    pub helper_image: ImageRef,
    pub registry_cluster_ip: String,
    /// Where helper-container logs are written, if anywhere.
    pub log_dir: Option<PathBuf>,
}

impl NetworkOptions {
    pub fn new(helper_image: ImageRef) -> Self {
        Self {
            public_hostname: None,
            port_forward: false,
            proxy: None,
            probe: ProbeSettings::default(),
            helper_image,
            registry_cluster_ip: REGISTRY_CLUSTER_IP.to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfig {
    server_ip: IpAddr,
    additional_ips: Vec<IpAddr>,
    #[serde(skip)]
    proxy: Option<ProxyConfig>,
    #[serde(skip)]
    registry_cluster_ip: String,
}

impl NetworkConfig {
    pub async fn build(
        engine: Arc<dyn EngineClient>,
        options: NetworkOptions,
    ) -> Result<Self, NetworkError> {
        let server_ip = if options.port_forward {
            tracing::debug!("using 127.0.0.1 as the host IP, ports will be forwarded");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else if let Some(ip) = public_ip(options.public_hostname.as_deref()) {
            tracing::debug!(%ip, "using the public hostname as the host IP");
            ip
        } else {
            probe::probe_loopback(
                Arc::clone(&engine),
                &options.helper_image,
                &options.probe,
                options.log_dir.clone(),
            )
            .await?
        };

        let additional_ips = enumerate_additional_ips(engine, &options, server_ip).await?;
        tracing::debug!(?additional_ips, "using additional IPs");

        Ok(Self {
            server_ip,
            additional_ips,
            proxy: options.proxy,
            registry_cluster_ip: options.registry_cluster_ip,
        })
    }

    pub fn server_ip(&self) -> IpAddr {
        self.server_ip
    }

    pub fn additional_ips(&self) -> &[IpAddr] {
        &self.additional_ips
    }

    /// The configured proxy with loopback, the server, and the registry
    /// appended to the no-proxy list. `None` when no proxy is configured.
    pub fn proxy_config(&self) -> Option<ProxyConfig> {
        let proxy = self.proxy.as_ref()?;
        let required = [
            "127.0.0.1".to_string(),
            self.server_ip.to_string(),
            "localhost".to_string(),
            self.registry_cluster_ip.clone(),
        ];

        let mut seen = HashSet::new();
        let no_proxy = proxy
            .no_proxy
            .iter()
            .cloned()
            .chain(required)
            .filter(|entry| seen.insert(entry.clone()))
            .collect();

        Some(ProxyConfig {
            no_proxy,
            ..proxy.clone()
        })
    }
}

impl fmt::Display for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let additional: Vec<String> = self.additional_ips.iter().map(|ip| ip.to_string()).collect();
        write!(
            f,
            "server: {}, additional: {}",
            self.server_ip,
            additional.join(",")
        )
    }
}

fn public_ip(hostname: Option<&str>) -> Option<IpAddr> {
    hostname?
        .trim()
        .parse::<IpAddr>()
        .ok()
        .filter(|ip| !ip.is_unspecified())
}

async fn enumerate_additional_ips(
    engine: Arc<dyn EngineClient>,
    options: &NetworkOptions,
    server_ip: IpAddr,
) -> Result<Vec<IpAddr>, NetworkError> {
    let name = ContainerName::new(&options.probe.enumerate_name).map_err(|e| {
        NetworkError::AdditionalIps(RunnerError::Configuration(format!("container name: {e}")))
    })?;

    let mut builder = ContainerRunner::builder(engine)
        .discard()
        .host_network()
        .privileged()
        .entrypoint(["hostname"])
        .command(["-I"])
        .wait_budget(options.probe.wait_budget);
    if let Some(dir) = &options.log_dir {
        builder = builder.persist_logs(dir.clone());
    }
    let runner = builder.build().await.map_err(NetworkError::AdditionalIps)?;

    let outcome = runner.run(&options.helper_image, &name).await;
    outcome.result().map_err(NetworkError::AdditionalIps)?;

    Ok(parse_additional_ips(&outcome.output(), server_ip))
}

/// Host IPs from `hostname -I` output, minus the server IP and IPv6 addresses.
pub fn parse_additional_ips(output: &str, server_ip: IpAddr) -> Vec<IpAddr> {
    output
        .split_whitespace()
        .filter(|candidate| !candidate.contains(':'))
        .filter_map(|candidate| match candidate.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::debug!(candidate, "ignoring unparseable host address");
                None
            }
        })
        .filter(|ip| *ip != server_ip)
        .collect()
}
