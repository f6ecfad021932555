// ABOUTME: The `cluster up` command: pre-flight checks, then network discovery.
// ABOUTME: Merges CLI flags over the settings file and reports the networking configuration.

use crate::cli::UpArgs;
use cluster_up::config::{ProxySettings, Settings};
use cluster_up::engine::{BollardEngine, EngineClient, detect_local};
use cluster_up::error::Result;
use cluster_up::network::{NetworkConfig, NetworkOptions, ProxyConfig};
use cluster_up::output::Output;
use cluster_up::preflight::{PreflightOptions, ValidatorChain};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize)]
struct NetworkReport<'a> {
    #[serde(flatten)]
    network: &'a NetworkConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<ProxyConfig>,
}

pub async fn up(args: UpArgs, output: &mut Output) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let settings = resolve_settings(&args, &cwd)?;
    output.start_timer();

    let endpoint = detect_local(Some(&settings.engine))?;
    output.progress(&format!(
        "Connecting to {} at {}",
        endpoint.kind, endpoint.address
    ));
    let engine: Arc<dyn EngineClient> = Arc::new(
        BollardEngine::connect(&endpoint)
            .await?
            .with_call_timeout(settings.timeouts.engine_call),
    );

    output.progress("Running pre-flight checks");
    let preflight = PreflightOptions {
        port_forward: args.forward_ports,
        skip_registry_check: args.skip_registry_check,
        ..PreflightOptions::default()
    };
    ValidatorChain::new(Arc::clone(&engine), &preflight)
        .validate()
        .await?;

    output.progress("Determining networking configuration");
    let mut options = NetworkOptions::new(settings.origin_image()?);
    options.public_hostname = settings.public_hostname.clone();
    options.port_forward = args.forward_ports;
    options.proxy = settings.proxy.as_ref().and_then(proxy_config);
    options.probe.timeout = settings.timeouts.probe;
    options.probe.wait_budget = settings.timeouts.container_wait;
    options.log_dir = settings.base_dir.clone();

    let network = NetworkConfig::build(engine, options).await?;
    tracing::info!(%network, "networking configuration");

    let report = NetworkReport {
        network: &network,
        proxy: network.proxy_config(),
    };
    output.success(&format!("Networking configuration: {network}"), &report);
    Ok(())
}

/// Settings file (explicit or discovered) with CLI flags applied on top.
fn resolve_settings(args: &UpArgs, cwd: &Path) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::discover(cwd)?,
    };
    apply_overrides(args, &mut settings);
    settings.origin_image()?;
    Ok(settings)
}

fn apply_overrides(args: &UpArgs, settings: &mut Settings) {
    if let Some(prefix) = &args.image {
        settings.image_prefix = prefix.clone();
    }
    if let Some(tag) = &args.tag {
        settings.image_tag = tag.clone();
    }
    if let Some(dir) = &args.base_dir {
        settings.base_dir = Some(dir.clone());
    }
    if let Some(hostname) = &args.public_hostname {
        settings.public_hostname = Some(hostname.clone());
    }

    if args.http_proxy.is_some() || args.https_proxy.is_some() || !args.no_proxy.is_empty() {
        let proxy = settings.proxy.get_or_insert_with(ProxySettings::default);
        if let Some(url) = &args.http_proxy {
            proxy.http_proxy = Some(url.clone());
        }
        if let Some(url) = &args.https_proxy {
            proxy.https_proxy = Some(url.clone());
        }
        if !args.no_proxy.is_empty() {
            proxy.no_proxy = args.no_proxy.clone();
        }
    }
}

/// A proxy only counts as configured when it names a proxy URL.
fn proxy_config(settings: &ProxySettings) -> Option<ProxyConfig> {
    if settings.http_proxy.is_none() && settings.https_proxy.is_none() {
        return None;
    }
    Some(ProxyConfig {
        http_proxy: settings.http_proxy.clone(),
        https_proxy: settings.https_proxy.clone(),
        no_proxy: settings.no_proxy.clone(),
    })
}
