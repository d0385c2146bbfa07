//! spotcost CLI
//!
//! Estimates job costs on spot capacity and picks the cheapest
//! storage/transfer/compute placement from recorded price history.
//!
//! Usage:
//!   spotcost <subcommand> [options]
//!
//! Available subcommands:
//!   optimize  - Cheapest storage/transfer/compute chain for a request
//!   estimate  - Cheapest slot per job plus storage
//!   slots     - Every start slot for one instance and region
//!   config    - Print an example configuration

mod cli;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use spotcost_optimization::OptimizerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = if let Some(ref path) = cli.config {
        OptimizerConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path))?
    } else {
        OptimizerConfig::load().unwrap_or_default()
    };

    let Some(command) = cli.command else {
        println!("spotcost v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Use 'spotcost --help' for usage information.");
        println!();
        println!("Quick start:");
        println!("  spotcost config > ~/.spotcost/config.toml");
        println!("  spotcost optimize --request job.json --prices prices.json");
        return Ok(());
    };

    match command {
        Commands::Optimize(cmd) => cmd.execute(config, cli.format).await,
        Commands::Estimate(cmd) => cmd.execute(config, cli.format).await,
        Commands::Slots(cmd) => cmd.execute(config, cli.format).await,
        Commands::Config(cmd) => cmd.execute(config, cli.format),
    }
}
