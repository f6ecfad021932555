// ABOUTME: Entry point for the cluster CLI application.
// ABOUTME: Parses arguments, initializes logging, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use cluster_up::error::Result;
use cluster_up::logging;
use cluster_up::output::Output;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init(cli.loglevel);

    let mut output = Output::new(cli.output);
    let result = run(cli, &mut output).await;

    if let Err(e) = result {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    match cli.command {
        Commands::Up(args) => commands::up(args, output).await,
    }
}
