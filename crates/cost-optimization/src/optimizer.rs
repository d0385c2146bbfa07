//! End-to-end chain selection
//!
//! A chain stores the data in one region, moves it to a compute region and
//! runs the job there at one start hour with one parallel factor. The
//! optimizer joins the three cost maps into candidate chains and hands the
//! exactly-one selection to a [`SelectionSolver`].

use crate::config::OptimizerConfig;
use crate::cost_maps::{ComputeCostMap, MapSizes, StorageCostMap, TransferCostMap};
use crate::error::{CostOptimizationError, CostOptimizationResult};
use crate::selection::{
    ExhaustiveSolver, LinearConstraint, SelectionProblem, SelectionSolver, SolverStatus,
};
use crate::types::{ComputeCost, ConfidenceInterval, StorageKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One feasible (storage region, compute region, instance, start, factor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Storage region
    pub storage_region: String,
    /// Compute region
    pub compute_region: String,
    /// Instance type
    pub instance_type: String,
    /// Reported start hour
    pub start_hour: f64,
    /// Parallel factor
    pub parallel_factor: u32,
    /// Per-instance duration in hours
    pub duration_hours: f64,
    /// Storage cost
    pub storage_cost: f64,
    /// Transfer rate times volume
    pub transfer_cost: f64,
    /// Compute cost interval
    pub compute: ConfidenceInterval,
    /// storage + transfer + compute mean
    pub total_cost: f64,
}

/// Decomposed cost of a chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Storage cost
    pub storage: f64,
    /// Transfer cost
    pub transfer: f64,
    /// Lower bound of the compute cost
    pub compute_low: f64,
    /// Expected compute cost
    pub compute_mean: f64,
    /// Upper bound of the compute cost
    pub compute_high: f64,
    /// storage + transfer + compute_mean
    pub total: f64,
}

/// Selected end-to-end placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    /// Storage region
    pub storage_region: String,
    /// Compute region
    pub compute_region: String,
    /// Instance type
    pub instance_type: String,
    /// Reported start hour
    pub start_hour: f64,
    /// Parallel factor
    pub parallel_factor: u32,
    /// Per-instance duration in hours
    pub duration_hours: f64,
    /// Total expected cost
    pub total_cost: f64,
    /// Cost decomposition
    pub breakdown: CostBreakdown,
}

impl From<Candidate> for Chain {
    fn from(candidate: Candidate) -> Self {
        Self {
            breakdown: CostBreakdown {
                storage: candidate.storage_cost,
                transfer: candidate.transfer_cost,
                compute_low: candidate.compute.low,
                compute_mean: candidate.compute.mean,
                compute_high: candidate.compute.high,
                total: candidate.total_cost,
            },
            storage_region: candidate.storage_region,
            compute_region: candidate.compute_region,
            instance_type: candidate.instance_type,
            start_hour: candidate.start_hour,
            parallel_factor: candidate.parallel_factor,
            duration_hours: candidate.duration_hours,
            total_cost: candidate.total_cost,
        }
    }
}

/// Joins cost maps and selects the cheapest chain
#[derive(Clone)]
pub struct ChainOptimizer {
    solver: Arc<dyn SelectionSolver>,
    timeout: Duration,
    max_total_cost: Option<f64>,
}

impl ChainOptimizer {
    /// Optimizer with the exhaustive solver and the configured timeout and
    /// budget
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            solver: Arc::new(ExhaustiveSolver),
            timeout: config.solver_timeout(),
            max_total_cost: config.max_total_cost,
        }
    }

    /// Use a different solver
    pub fn with_solver(mut self, solver: Arc<dyn SelectionSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the budget ceiling
    pub fn with_budget(mut self, max_total_cost: Option<f64>) -> Self {
        self.max_total_cost = max_total_cost;
        self
    }

    /// Replace the solver timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every storage/transfer/compute combination with a positive compute
    /// cost, in a deterministic order.
    ///
    /// A storage entry only joins compute costs of the same per-instance
    /// duration, so both sides of a chain price the same job. Each compute
    /// key contributes its cheapest matching cost.
    pub fn candidates(
        &self,
        compute: &ComputeCostMap,
        storage: &StorageCostMap,
        transfer: &TransferCostMap,
        volume_gb: f64,
    ) -> Vec<Candidate> {
        let mut compute_index: HashMap<(&str, &str, u32), Vec<(f64, &[ComputeCost])>> =
            HashMap::new();
        for (key, costs) in compute.iter() {
            compute_index
                .entry((
                    key.region.as_str(),
                    key.instance_type.as_str(),
                    key.parallel_factor,
                ))
                .or_default()
                .push((key.start_hour.into_inner(), costs));
        }
        for slots in compute_index.values_mut() {
            slots.sort_by(|a, b| a.0.total_cmp(&b.0));
        }

        let mut storage_index: HashMap<&str, Vec<(&StorageKey, f64)>> = HashMap::new();
        for (key, cost) in storage.iter() {
            storage_index
                .entry(key.region.as_str())
                .or_default()
                .push((key, cost));
        }
        for entries in storage_index.values_mut() {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }

        let mut routes: Vec<_> = transfer.iter().collect();
        routes.sort_by(|a, b| a.0.cmp(b.0));

        let mut candidates = Vec::new();
        for (route, rate) in routes {
            let Some(stored) = storage_index.get(route.from.as_str()) else {
                continue;
            };
            let transfer_cost = rate * volume_gb;

            for (storage_key, storage_cost) in stored {
                let Some(slots) = compute_index.get(&(
                    route.to.as_str(),
                    storage_key.instance_type.as_str(),
                    storage_key.parallel_factor,
                )) else {
                    continue;
                };

                let duration = storage_key.duration_hours.into_inner();
                for (start_hour, costs) in slots {
                    let Some(cost) = costs.iter().find(|c| {
                        c.duration_hours == duration
                            && c.cost_mean.is_finite()
                            && c.cost_mean > 0.0
                    }) else {
                        continue;
                    };
                    let total_cost = storage_cost + transfer_cost + cost.cost_mean;
                    candidates.push(Candidate {
                        storage_region: route.from.clone(),
                        compute_region: route.to.clone(),
                        instance_type: storage_key.instance_type.clone(),
                        start_hour: *start_hour,
                        parallel_factor: storage_key.parallel_factor,
                        duration_hours: cost.duration_hours,
                        storage_cost: *storage_cost,
                        transfer_cost,
                        compute: ConfidenceInterval::new(
                            cost.cost_low,
                            cost.cost_mean,
                            cost.cost_high,
                        ),
                        total_cost,
                    });
                }
            }
        }

        debug!("Joined {} candidate chains", candidates.len());
        candidates
    }

    /// Cheapest chain over the three maps
    pub async fn optimize(
        &self,
        compute: &ComputeCostMap,
        storage: &StorageCostMap,
        transfer: &TransferCostMap,
        volume_gb: f64,
    ) -> CostOptimizationResult<Chain> {
        let candidates = self.candidates(compute, storage, transfer, volume_gb);
        self.select(candidates, sizes(compute, storage, transfer)).await
    }

    /// Solve the selection problem over precomputed candidates
    pub async fn select(
        &self,
        candidates: Vec<Candidate>,
        sizes: MapSizes,
    ) -> CostOptimizationResult<Chain> {
        if candidates.is_empty() {
            return Err(sizes.no_feasible_chain("join"));
        }

        let costs: Vec<f64> = candidates.iter().map(|c| c.total_cost).collect();
        let mut problem = SelectionProblem::new(costs.clone());
        if let Some(budget) = self.max_total_cost {
            problem = problem.with_constraint(LinearConstraint {
                coefficients: costs,
                upper_bound: budget,
                label: "budget".to_string(),
            });
        }

        let solver_name = self.solver.name().to_string();
        let non_optimal = |status: String| CostOptimizationError::SolverNonOptimal {
            solver: solver_name.clone(),
            status,
        };

        let solver = Arc::clone(&self.solver);
        let deadline = Instant::now().checked_add(self.timeout);
        let handle = tokio::task::spawn_blocking(move || solver.solve(&problem, deadline));

        let outcome = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                return Err(CostOptimizationError::TaskFailed {
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(non_optimal(SolverStatus::TimedOut.to_string())),
        };

        match (outcome.status, outcome.chosen) {
            (SolverStatus::Optimal, Some(index)) => {
                let candidate = candidates
                    .into_iter()
                    .nth(index)
                    .ok_or_else(|| non_optimal(format!("chosen index {index} out of range")))?;
                info!(
                    "Selected chain {} -> {} {} at {:.2}h x{}: total {:.4}",
                    candidate.storage_region,
                    candidate.compute_region,
                    candidate.instance_type,
                    candidate.start_hour,
                    candidate.parallel_factor,
                    candidate.total_cost
                );
                Ok(Chain::from(candidate))
            }
            (SolverStatus::Infeasible, _) if self.max_total_cost.is_some() => {
                Err(sizes.no_feasible_chain("budget"))
            }
            (status, _) => Err(non_optimal(status.to_string())),
        }
    }

    /// The `n` cheapest chains within budget, cheapest first
    pub fn optimize_ranked(
        &self,
        compute: &ComputeCostMap,
        storage: &StorageCostMap,
        transfer: &TransferCostMap,
        volume_gb: f64,
        n: usize,
    ) -> CostOptimizationResult<Vec<Chain>> {
        let candidates = self.candidates(compute, storage, transfer, volume_gb);
        self.rank(candidates, sizes(compute, storage, transfer), n)
    }

    /// Rank precomputed candidates; ties keep candidate order
    pub fn rank(
        &self,
        mut candidates: Vec<Candidate>,
        sizes: MapSizes,
        n: usize,
    ) -> CostOptimizationResult<Vec<Chain>> {
        if candidates.is_empty() {
            return Err(sizes.no_feasible_chain("join"));
        }
        if let Some(budget) = self.max_total_cost {
            candidates.retain(|c| c.total_cost <= budget);
            if candidates.is_empty() {
                return Err(sizes.no_feasible_chain("budget"));
            }
        }

        candidates.sort_by(|a, b| a.total_cost.total_cmp(&b.total_cost));
        Ok(candidates.into_iter().take(n).map(Chain::from).collect())
    }
}

fn sizes(
    compute: &ComputeCostMap,
    storage: &StorageCostMap,
    transfer: &TransferCostMap,
) -> MapSizes {
    MapSizes {
        compute: compute.len(),
        storage: storage.len(),
        transfer: transfer.len(),
    }
}
