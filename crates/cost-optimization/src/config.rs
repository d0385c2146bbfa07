//! Optimizer configuration
//!
//! Loaded from ~/.spotcost/config.toml or an explicit path; every field has a
//! default so a partial file is valid.

use crate::error::{CostOptimizationError, CostOptimizationResult};
use crate::slot_search::SlotSearchConfig;
use crate::types::CloudProvider;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Upper bound on concurrent price source calls
    #[serde(default = "default_max_in_flight_fetches")]
    pub max_in_flight_fetches: usize,

    /// Solver wall-clock limit in seconds
    #[serde(default = "default_solver_timeout_secs")]
    pub solver_timeout_secs: u64,

    /// Hours used to turn monthly storage prices into hourly ones
    #[serde(default = "default_hours_per_month")]
    pub hours_per_month: f64,

    /// Per-GB rate for region pairs without a known transfer price
    #[serde(default = "default_transfer_rate_per_gb")]
    pub default_transfer_rate_per_gb: f64,

    /// Flat per-GB rate between Azure regions
    #[serde(default = "default_azure_intra_fabric_rate_per_gb")]
    pub azure_intra_fabric_rate_per_gb: f64,

    /// Drop start slots whose window covers an hour without prices
    #[serde(default = "default_true")]
    pub skip_windows_with_gaps: bool,

    /// Optional ceiling on the total chain cost
    #[serde(default)]
    pub max_total_cost: Option<f64>,

    /// Parallel factors used when a request names none
    #[serde(default = "default_parallel_factors")]
    pub default_parallel_factors: Vec<u32>,
}

fn default_max_in_flight_fetches() -> usize {
    8
}
fn default_solver_timeout_secs() -> u64 {
    30
}
fn default_hours_per_month() -> f64 {
    730.0
}
fn default_transfer_rate_per_gb() -> f64 {
    0.02
}
fn default_azure_intra_fabric_rate_per_gb() -> f64 {
    0.0192
}
fn default_true() -> bool {
    true
}
fn default_parallel_factors() -> Vec<u32> {
    vec![1]
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_in_flight_fetches: default_max_in_flight_fetches(),
            solver_timeout_secs: default_solver_timeout_secs(),
            hours_per_month: default_hours_per_month(),
            default_transfer_rate_per_gb: default_transfer_rate_per_gb(),
            azure_intra_fabric_rate_per_gb: default_azure_intra_fabric_rate_per_gb(),
            skip_windows_with_gaps: true,
            max_total_cost: None,
            default_parallel_factors: default_parallel_factors(),
        }
    }
}

impl OptimizerConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".spotcost")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default location or return defaults
    pub fn load() -> CostOptimizationResult<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> CostOptimizationResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> CostOptimizationResult<()> {
        let invalid = |message: String| Err(CostOptimizationError::ConfigurationError { message });

        if self.max_in_flight_fetches == 0 {
            return invalid("max_in_flight_fetches must be at least 1".to_string());
        }
        if !(self.hours_per_month.is_finite() && self.hours_per_month > 0.0) {
            return invalid(format!("hours_per_month {} must be positive", self.hours_per_month));
        }
        for (name, rate) in [
            ("default_transfer_rate_per_gb", self.default_transfer_rate_per_gb),
            ("azure_intra_fabric_rate_per_gb", self.azure_intra_fabric_rate_per_gb),
        ] {
            if !(rate.is_finite() && rate >= 0.0) {
                return invalid(format!("{name} {rate} must be non-negative"));
            }
        }
        if self.default_parallel_factors.is_empty() || self.default_parallel_factors.contains(&0) {
            return invalid("default_parallel_factors must be non-empty and positive".to_string());
        }
        if let Some(budget) = self.max_total_cost {
            if !(budget.is_finite() && budget >= 0.0) {
                return invalid(format!("max_total_cost {budget} must be non-negative"));
            }
        }
        Ok(())
    }

    /// Solver wall-clock limit
    pub fn solver_timeout(&self) -> Duration {
        Duration::from_secs(self.solver_timeout_secs)
    }

    /// Slot search settings
    pub fn slot_search(&self) -> SlotSearchConfig {
        SlotSearchConfig {
            skip_windows_with_gaps: self.skip_windows_with_gaps,
        }
    }

    /// Flat inter-region rate for providers that have one
    pub fn flat_transfer_rate(&self, provider: CloudProvider) -> Option<f64> {
        match provider {
            CloudProvider::Azure => Some(self.azure_intra_fabric_rate_per_gb),
            CloudProvider::Aws => None,
        }
    }
}

/// Generate example configuration file content
pub fn example_config() -> &'static str {
    r#"# spotcost configuration
# Location: ~/.spotcost/config.toml

# Concurrent price source calls while building cost maps
max_in_flight_fetches = 8

# Seconds before the chain solver gives up
solver_timeout_secs = 30

# Monthly storage prices are divided by this
hours_per_month = 730.0

# Per-GB transfer rate when no price is known
default_transfer_rate_per_gb = 0.02

# Flat per-GB rate between Azure regions
azure_intra_fabric_rate_per_gb = 0.0192

# Ignore start slots that cover hours without price data
skip_windows_with_gaps = true

# Parallel factors tried when a request names none
default_parallel_factors = [1]

# Reject chains above this total cost
# max_total_cost = 50.0
"#
}
