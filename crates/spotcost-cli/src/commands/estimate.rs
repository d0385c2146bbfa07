//! `spotcost estimate`

use anyhow::{Context, Result};
use clap::Args;
use spotcost_optimization::{OptimizerConfig, PlacementPlanner};
use std::path::PathBuf;

use super::{load_request, load_store};
use crate::cli::OutputFormat;
use crate::output;

/// Cheapest slot per job over all regions
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Request file (JSON)
    #[arg(short, long)]
    pub request: PathBuf,

    /// Price snapshot file (JSON)
    #[arg(short, long)]
    pub prices: PathBuf,
}

impl EstimateArgs {
    pub async fn execute(self, config: OptimizerConfig, format: OutputFormat) -> Result<()> {
        let request = load_request(&self.request)?;
        let store = load_store(&self.prices)?;

        let report = PlacementPlanner::from_store(store, config)
            .estimate_jobs(&request)
            .await
            .context("Job estimation failed")?;

        output::print_estimates(&report, format)
    }
}
