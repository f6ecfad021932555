// ABOUTME: Command module aggregator for the cluster CLI.
// ABOUTME: Re-exports the up command handler.

mod up;

pub use up::up;
