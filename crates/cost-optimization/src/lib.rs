//! Spot placement cost optimization
//!
//! This crate estimates what a job costs on volatile-priced cloud capacity
//! and picks the cheapest placement:
//! - Per-hour price confidence intervals from historical samples
//! - Cheapest start slot for fractional and parallelized durations
//! - Compute, storage and transfer cost maps built concurrently
//! - Exactly-one chain selection over storage region, compute region,
//!   instance, start hour and parallel factor

#![warn(missing_docs)]

pub mod config;
pub mod cost_maps;
pub mod error;
pub mod optimizer;
pub mod planner;
pub mod profile;
pub mod selection;
pub mod slot_search;
pub mod sources;
pub mod statistics;
pub mod types;

pub use config::{example_config, OptimizerConfig};
pub use error::{CostOptimizationError, CostOptimizationResult};

// Cost maps
pub use cost_maps::{
    ComputeCostMap, CostMapBuilder, CostMaps, MapSizes, StorageCostMap, StorageSku,
    TransferCostMap, TransferPolicy,
};

// Chain selection
pub use optimizer::{Candidate, Chain, ChainOptimizer, CostBreakdown};
pub use selection::{
    ExhaustiveSolver, LinearConstraint, SelectionProblem, SelectionSolver, SolverOutcome,
    SolverStatus,
};

// Request boundary
pub use planner::{
    JobEstimate, JobEstimateReport, JobTotals, OptimizationRequest, PlacementPlanner,
    PlacementResponse, StorageEstimate,
};

// Price estimation and slot search
pub use profile::HourlyPriceProfile;
pub use slot_search::{MeanProfile, Scenario, ScenarioPair, SlotCost, SlotSearch, SlotSearchConfig};
pub use statistics::PriceStatistics;

// Collaborators
pub use sources::{
    InMemoryPriceStore, PriceSnapshot, PriceSource, StoragePrice, StoragePriceSource,
    TransferPrice, TransferPriceSource,
};

pub use types::{
    CloudProvider, ComputeCost, ComputeKey, ConfidenceInterval, CostQuote, JobDescriptor,
    PricePoint, RegionPrice, StorageKey, StorageRequest, TransferKey, HOURS_PER_DAY,
    SECONDS_PER_HOUR,
};
