//! `spotcost optimize`

use anyhow::{Context, Result};
use clap::Args;
use spotcost_optimization::{OptimizerConfig, PlacementPlanner};
use std::path::PathBuf;

use super::{load_request, load_store};
use crate::cli::OutputFormat;
use crate::output;

/// Select the cheapest storage/transfer/compute chain
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Request file (JSON)
    #[arg(short, long)]
    pub request: PathBuf,

    /// Price snapshot file (JSON)
    #[arg(short, long)]
    pub prices: PathBuf,

    /// Reject chains above this total; overrides config and request
    #[arg(long)]
    pub max_total_cost: Option<f64>,
}

impl OptimizeArgs {
    pub async fn execute(self, config: OptimizerConfig, format: OutputFormat) -> Result<()> {
        let mut request = load_request(&self.request)?;
        if self.max_total_cost.is_some() {
            request.max_total_cost = self.max_total_cost;
        }
        let store = load_store(&self.prices)?;

        let planner = PlacementPlanner::from_store(store, config);
        let response = planner
            .optimize(&request)
            .await
            .context("Placement optimization failed")?;

        output::print_placement(&response, format)
    }
}
