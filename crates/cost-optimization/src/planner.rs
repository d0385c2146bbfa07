//! Request-level entry points
//!
//! [`PlacementPlanner`] validates a request, builds fresh cost maps for it
//! and either selects one chain or estimates every job independently. Maps
//! are never shared between requests.

use crate::config::OptimizerConfig;
use crate::cost_maps::{CostMapBuilder, TransferCostMap};
use crate::error::{CostOptimizationError, CostOptimizationResult};
use crate::optimizer::{Chain, ChainOptimizer};
use crate::sources::InMemoryPriceStore;
use crate::types::{
    validate_confidence_level, CloudProvider, JobDescriptor, StorageRequest, SECONDS_PER_HOUR,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Number of runner-up chains returned with a placement
const ALTERNATIVE_COUNT: usize = 5;

fn default_confidence_level() -> f64 {
    95.0
}

/// What to place and under which constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    /// Cloud provider
    pub provider: CloudProvider,
    /// Jobs to place
    pub jobs: Vec<JobDescriptor>,
    /// Confidence level in percent
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Input data storage
    pub storage: StorageRequest,
    /// Parallel factors to try; empty means the configured default
    #[serde(default)]
    pub parallel_factors: Vec<u32>,
    /// Regions to consider instead of the provider defaults
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    /// Ceiling on the chain total; overrides the configured one
    #[serde(default)]
    pub max_total_cost: Option<f64>,
}

impl OptimizationRequest {
    /// Reject requests the engine cannot answer
    pub fn validate(&self) -> CostOptimizationResult<()> {
        validate_confidence_level(self.confidence_level)?;

        if self.jobs.is_empty() {
            return Err(CostOptimizationError::invalid_input(
                "jobs",
                "at least one job is required",
            ));
        }
        for (index, job) in self.jobs.iter().enumerate() {
            if job.instance_type.trim().is_empty() {
                return Err(CostOptimizationError::invalid_input(
                    format!("jobs[{index}].instance_type"),
                    "must not be empty",
                ));
            }
            if !(job.duration_seconds.is_finite() && job.duration_seconds > 0.0) {
                return Err(CostOptimizationError::invalid_input(
                    format!("jobs[{index}].duration_seconds"),
                    format!("{} must be positive", job.duration_seconds),
                ));
            }
        }

        if !(self.storage.volume_gb.is_finite() && self.storage.volume_gb > 0.0) {
            return Err(CostOptimizationError::invalid_input(
                "storage.volume_gb",
                format!("{} must be positive", self.storage.volume_gb),
            ));
        }
        if self.parallel_factors.contains(&0) {
            return Err(CostOptimizationError::invalid_input(
                "parallel_factors",
                "factors must be at least 1",
            ));
        }
        if let Some(regions) = &self.regions {
            if regions.is_empty() {
                return Err(CostOptimizationError::invalid_input(
                    "regions",
                    "override must name at least one region",
                ));
            }
        }
        if let Some(budget) = self.max_total_cost {
            if !(budget.is_finite() && budget >= 0.0) {
                return Err(CostOptimizationError::invalid_input(
                    "max_total_cost",
                    format!("{budget} must be non-negative"),
                ));
            }
        }
        Ok(())
    }

    /// Requested regions, or the provider defaults
    pub fn regions(&self) -> Vec<String> {
        match &self.regions {
            Some(regions) => regions.clone(),
            None => self.provider.default_regions(),
        }
    }

    /// Jobs with instance names in the form the price history uses
    pub fn normalized_jobs(&self) -> Vec<JobDescriptor> {
        self.jobs
            .iter()
            .map(|job| JobDescriptor {
                instance_type: self.provider.normalize_instance_name(&job.instance_type),
                duration_seconds: job.duration_seconds,
            })
            .collect()
    }

    fn parallel_factors(&self, config: &OptimizerConfig) -> Vec<u32> {
        if self.parallel_factors.is_empty() {
            config.default_parallel_factors.clone()
        } else {
            self.parallel_factors.clone()
        }
    }
}

/// Result of a placement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementResponse {
    /// Run identifier
    pub run_id: Uuid,
    /// When the placement was computed
    pub generated_at: DateTime<Utc>,
    /// Provider
    pub provider: CloudProvider,
    /// Currency symbol of all costs
    pub currency: String,
    /// Confidence level used
    pub confidence_level: f64,
    /// Storage SKU the storage costs refer to
    pub storage_sku: String,
    /// Selected chain
    pub chain: Chain,
    /// Cheapest alternatives including the selected chain
    pub alternatives: Vec<Chain>,
    /// Number of candidate chains considered
    pub candidate_count: usize,
}

/// Cheapest slot for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEstimate {
    /// Instance type
    pub instance_type: String,
    /// Region of the cheapest slot
    pub region: String,
    /// Reported start hour
    pub start_hour: f64,
    /// Duration in hours
    pub duration_hours: f64,
    /// Lower bound
    pub cost_low: f64,
    /// Expected cost
    pub cost_mean: f64,
    /// Upper bound
    pub cost_high: f64,
}

/// Sums over all job estimates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTotals {
    /// Sum of lower bounds
    pub cost_low: f64,
    /// Sum of expected costs
    pub cost_mean: f64,
    /// Sum of upper bounds
    pub cost_high: f64,
    /// Sum of durations in hours
    pub duration_hours: f64,
}

/// Storage for a job set, kept in the cheapest region and moved to the
/// region of the cheapest job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEstimate {
    /// SKU
    pub sku: String,
    /// Storage region
    pub region: String,
    /// Storage cost over the summed job durations
    pub storage_cost: f64,
    /// Transfer cost to the compute region
    pub transfer_cost: f64,
    /// storage_cost + transfer_cost
    pub total: f64,
}

/// Per-job estimates for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEstimateReport {
    /// Run identifier
    pub run_id: Uuid,
    /// Provider
    pub provider: CloudProvider,
    /// Currency symbol of all costs
    pub currency: String,
    /// Confidence level used
    pub confidence_level: f64,
    /// One estimate per job, in request order
    pub estimates: Vec<JobEstimate>,
    /// Sums over the estimates
    pub totals: JobTotals,
    /// Storage estimate, absent when no region offers the SKU
    pub storage: Option<StorageEstimate>,
}

/// Validates requests and runs the engine end to end
#[derive(Clone)]
pub struct PlacementPlanner {
    builder: CostMapBuilder,
    config: Arc<OptimizerConfig>,
}

impl PlacementPlanner {
    /// Create a planner over a cost map builder
    pub fn new(builder: CostMapBuilder, config: Arc<OptimizerConfig>) -> Self {
        Self { builder, config }
    }

    /// Planner backed by one in-memory store
    pub fn from_store(store: Arc<InMemoryPriceStore>, config: OptimizerConfig) -> Self {
        let config = Arc::new(config);
        Self::new(CostMapBuilder::from_store(store, Arc::clone(&config)), config)
    }

    /// Cheapest storage/transfer/compute chain for the request
    pub async fn optimize(
        &self,
        request: &OptimizationRequest,
    ) -> CostOptimizationResult<PlacementResponse> {
        request.validate()?;
        let run_id = Uuid::new_v4();
        let regions = request.regions();
        let jobs = request.normalized_jobs();
        let factors = request.parallel_factors(&self.config);

        info!(
            "Run {}: optimizing {} jobs over {} {} regions with factors {:?}",
            run_id,
            jobs.len(),
            regions.len(),
            request.provider,
            factors
        );

        let maps = self
            .builder
            .build_all(
                request.provider,
                &regions,
                &jobs,
                &factors,
                request.confidence_level,
                &request.storage,
            )
            .await?;

        let optimizer = ChainOptimizer::new(&self.config)
            .with_budget(request.max_total_cost.or(self.config.max_total_cost));
        let candidates = optimizer.candidates(
            &maps.compute,
            &maps.storage,
            &maps.transfer,
            request.storage.volume_gb,
        );
        let candidate_count = candidates.len();
        let sizes = maps.sizes();

        let alternatives = optimizer
            .rank(candidates.clone(), sizes, ALTERNATIVE_COUNT)
            .unwrap_or_default();
        let chain = optimizer.select(candidates, sizes).await?;

        Ok(PlacementResponse {
            run_id,
            generated_at: Utc::now(),
            provider: request.provider,
            currency: request.provider.currency_symbol().to_string(),
            confidence_level: request.confidence_level,
            storage_sku: maps.storage_sku.to_string(),
            chain,
            alternatives,
            candidate_count,
        })
    }

    /// Cheapest single-instance slot for each job over every region.
    ///
    /// A job that cannot run anywhere fails the whole report with
    /// `NoFeasibleChain` at stage `job_estimate`.
    pub async fn estimate_jobs(
        &self,
        request: &OptimizationRequest,
    ) -> CostOptimizationResult<JobEstimateReport> {
        request.validate()?;
        let run_id = Uuid::new_v4();
        let regions = request.regions();
        let jobs = request.normalized_jobs();

        let compute = self
            .builder
            .build_compute_map(&regions, &jobs, &[1], request.confidence_level)
            .await?;

        let mut estimates = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let hours = job.duration_hours();
            let best = compute
                .iter()
                .filter(|(key, _)| {
                    key.instance_type == job.instance_type && key.parallel_factor == 1
                })
                .filter_map(|(key, costs)| {
                    costs
                        .iter()
                        .find(|c| c.duration_hours == hours)
                        .map(|cost| (key, cost))
                })
                .min_by(|(ka, a), (kb, b)| {
                    a.cost_mean
                        .total_cmp(&b.cost_mean)
                        .then_with(|| {
                            region_rank(&regions, &ka.region)
                                .cmp(&region_rank(&regions, &kb.region))
                        })
                        .then_with(|| ka.start_hour.cmp(&kb.start_hour))
                });

            let Some((key, cost)) = best else {
                warn!("No region can run {} for {:.2}h", job.instance_type, hours);
                return Err(CostOptimizationError::NoFeasibleChain {
                    stage: "job_estimate".to_string(),
                    compute_entries: compute.len(),
                    storage_entries: 0,
                    transfer_entries: 0,
                });
            };

            estimates.push(JobEstimate {
                instance_type: job.instance_type.clone(),
                region: key.region.clone(),
                start_hour: key.start_hour.into_inner(),
                duration_hours: cost.duration_hours,
                cost_low: cost.cost_low,
                cost_mean: cost.cost_mean,
                cost_high: cost.cost_high,
            });
        }

        let totals = estimates.iter().fold(JobTotals::default(), |acc, e| JobTotals {
            cost_low: acc.cost_low + e.cost_low,
            cost_mean: acc.cost_mean + e.cost_mean,
            cost_high: acc.cost_high + e.cost_high,
            duration_hours: acc.duration_hours + e.duration_hours,
        });

        let storage = self
            .estimate_storage(request, &regions, &estimates, totals.duration_hours)
            .await?;

        info!(
            "Run {}: {} job estimates, expected total {:.4}",
            run_id,
            estimates.len(),
            totals.cost_mean
        );

        Ok(JobEstimateReport {
            run_id,
            provider: request.provider,
            currency: request.provider.currency_symbol().to_string(),
            confidence_level: request.confidence_level,
            estimates,
            totals,
            storage,
        })
    }

    async fn estimate_storage(
        &self,
        request: &OptimizationRequest,
        regions: &[String],
        estimates: &[JobEstimate],
        total_hours: f64,
    ) -> CostOptimizationResult<Option<StorageEstimate>> {
        let Some(compute_region) = estimates
            .iter()
            .min_by(|a, b| a.cost_mean.total_cmp(&b.cost_mean))
            .map(|e| e.region.clone())
        else {
            return Ok(None);
        };

        // a single span covering every job's run time
        let span = [JobDescriptor::new("all-jobs", total_hours * SECONDS_PER_HOUR)];
        let (sku, map) = self
            .builder
            .build_storage_map(request.provider, &request.storage, regions, &span, &[1])
            .await?;

        let Some((key, storage_cost)) = map
            .iter()
            .min_by(|(ka, a), (kb, b)| a.total_cmp(b).then_with(|| ka.region.cmp(&kb.region)))
        else {
            return Ok(None);
        };
        let storage_region = key.region.clone();

        let transfer: TransferCostMap = self
            .builder
            .build_transfer_map(
                request.provider,
                &[storage_region.clone(), compute_region.clone()],
            )
            .await?;
        let rate = transfer
            .get(&storage_region, &compute_region)
            .unwrap_or(self.config.default_transfer_rate_per_gb);
        let transfer_cost = rate * request.storage.volume_gb;

        Ok(Some(StorageEstimate {
            sku: sku.to_string(),
            region: storage_region,
            storage_cost,
            transfer_cost,
            total: storage_cost + transfer_cost,
        }))
    }
}

fn region_rank(regions: &[String], region: &str) -> usize {
    regions.iter().position(|r| r == region).unwrap_or(usize::MAX)
}
