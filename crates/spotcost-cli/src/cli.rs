//! Root command structure

use clap::{Parser, Subcommand};

use crate::commands::{ConfigArgs, EstimateArgs, OptimizeArgs, SlotsArgs};

/// spotcost - cheapest spot placement for batch jobs
#[derive(Parser)]
#[command(name = "spotcost")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cheapest storage/transfer/compute chain for a request
    Optimize(OptimizeArgs),

    /// Cheapest slot per job over all regions, plus storage
    Estimate(EstimateArgs),

    /// Every start slot for one instance type in one region
    Slots(SlotsArgs),

    /// Print an example configuration file
    Config(ConfigArgs),
}
