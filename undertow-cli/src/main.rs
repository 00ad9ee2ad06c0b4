//! Undertow CLI - Command-line interface
//!
//! Loads a topology, runs the routing protocol over it and prints the result.

mod commands;
mod console;
mod topology_file;
mod tracing_setup;

use std::path::PathBuf;

use clap::Parser;

use crate::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "undertow")]
#[command(about = "A distance-vector routing simulator")]
struct Cli {
    /// Console log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the per-run trace log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;
    commands::handle_command(cli.command).await
}
