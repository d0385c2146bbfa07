//! `spotcost slots`

use anyhow::{bail, Context, Result};
use clap::Args;
use spotcost_optimization::types::validate_confidence_level;
use spotcost_optimization::{
    CloudProvider, CostMapBuilder, CostQuote, HourlyPriceProfile, MeanProfile, OptimizerConfig,
    SlotSearch,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use super::load_store;
use crate::cli::OutputFormat;
use crate::output;

/// Every usable start slot for one instance type in one region
#[derive(Args, Debug)]
pub struct SlotsArgs {
    /// Price snapshot file (JSON)
    #[arg(short, long)]
    pub prices: PathBuf,

    /// Instance type
    #[arg(short, long)]
    pub instance: String,

    /// Region
    #[arg(short, long)]
    pub region: String,

    /// Job duration on one instance, in hours
    #[arg(long)]
    pub hours: f64,

    /// Parallel factor; repeat for several (defaults to config)
    #[arg(long)]
    pub factor: Vec<u32>,

    /// Confidence level in percent
    #[arg(long, default_value = "95")]
    pub confidence: f64,

    /// Provider, used for the currency symbol
    #[arg(long, default_value = "aws")]
    pub provider: String,

    /// Mean-only search: one cheapest slot per factor, no interval bounds.
    /// Needs a price for every hour.
    #[arg(long)]
    pub fast: bool,
}

impl SlotsArgs {
    pub async fn execute(self, config: OptimizerConfig, format: OutputFormat) -> Result<()> {
        validate_confidence_level(self.confidence)?;
        if !(self.hours.is_finite() && self.hours > 0.0) {
            bail!("--hours must be positive, got {}", self.hours);
        }
        if self.factor.contains(&0) {
            bail!("--factor must be at least 1");
        }
        let provider: CloudProvider = self.provider.parse()?;

        let factors = if self.factor.is_empty() {
            config.default_parallel_factors.clone()
        } else {
            self.factor
        };
        let search = SlotSearch::new(config.slot_search());
        let store = load_store(&self.prices)?;
        let builder = CostMapBuilder::from_store(store, Arc::new(config));

        let profile = builder
            .fetch_profile(&self.instance, &self.region, self.confidence)
            .await
            .with_context(|| {
                format!("Failed to read prices for {} in {}", self.instance, self.region)
            })?;
        if profile.is_priceless() {
            warn!("No usable prices for {} in {}", self.instance, self.region);
        }

        let mut quotes = if self.fast {
            cheapest_by_mean(&profile, &self.region, self.hours, &factors)?
        } else {
            search.find_all_slots(&profile, &self.region, self.hours, &factors)
        };
        quotes.sort_by(|a, b| {
            a.cost_mean
                .total_cmp(&b.cost_mean)
                .then_with(|| a.parallel_factor.cmp(&b.parallel_factor))
                .then_with(|| a.start_hour.total_cmp(&b.start_hour))
        });

        output::print_slots(&quotes, provider.currency_symbol(), format)
    }
}

/// Cheapest start per factor from the mean-only fast path
fn cheapest_by_mean(
    profile: &HourlyPriceProfile,
    region: &str,
    hours: f64,
    factors: &[u32],
) -> Result<Vec<CostQuote>> {
    let means = MeanProfile::from_profile(profile);
    if !means.is_complete() {
        bail!("--fast needs a price for every hour of the day");
    }

    Ok(factors
        .iter()
        .filter_map(|&factor| {
            let (start_hour, cost) = means.cheapest_start_parallel(hours, factor)?;
            Some(CostQuote {
                cost_low: cost,
                cost_mean: cost,
                cost_high: cost,
                start_hour,
                duration_hours: hours / factor as f64,
                region: region.to_string(),
                parallel_factor: factor,
            })
        })
        .collect())
}
