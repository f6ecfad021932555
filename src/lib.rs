// ABOUTME: Library root for cluster-up - exposes the runner, probe, and pre-flight checks.
// ABOUTME: The `cluster` binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod logging;
pub mod network;
pub mod output;
pub mod preflight;
pub mod runner;
pub mod types;
