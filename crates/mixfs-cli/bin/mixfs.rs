//! mixfs binary entry point.
//!
//! Parses the command line, installs the log subscriber and hands over to
//! the library.

use anyhow::Result;
use clap::Parser;
use mixfs_cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    mixfs_cli::run(cli).await
}
