// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the `up` subcommand and the global logging and output flags.

use clap::{Args, Parser, Subcommand};
use cluster_up::logging::DEFAULT_LOG_LEVEL;
use cluster_up::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cluster")]
#[command(about = "Bring up a single-node cluster on a local container engine")]
#[command(version)]
pub struct Cli {
    /// Log verbosity from 0 (errors only) to 5 (trace)
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_LOG_LEVEL,
        value_parser = clap::value_parser!(u8).range(0..=5)
    )]
    pub loglevel: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the engine, then work out the cluster's networking configuration
    Up(UpArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct UpArgs {
    /// IP address the cluster is reachable on; probed when omitted
    #[arg(long)]
    pub public_hostname: Option<String>,

    /// Forward ports from this host instead of binding them on the engine host
    #[arg(long)]
    pub forward_ports: bool,

    /// Skip the insecure registry configuration check
    #[arg(long)]
    pub skip_registry_check: bool,

    /// Directory for cluster state; helper container logs are written to <DIR>/logs
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Image prefix for the cluster images
    #[arg(long, value_name = "PREFIX")]
    pub image: Option<String>,

    #[arg(long, hide = true)]
    pub tag: Option<String>,

    #[arg(long, value_name = "URL")]
    pub http_proxy: Option<String>,

    #[arg(long, value_name = "URL")]
    pub https_proxy: Option<String>,

    /// Hosts that bypass the proxy (repeatable, comma-separated)
    #[arg(long, value_name = "HOST", value_delimiter = ',')]
    pub no_proxy: Vec<String>,

    /// Settings file (defaults to ./cluster-up.yml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
