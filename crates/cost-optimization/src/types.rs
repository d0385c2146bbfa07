//! Shared data types for price estimation, slot search and chain selection
//!
//! Map keys are small value types with `Eq + Hash` so the builders and the
//! optimizer cannot disagree on key shape. Fractional start hours are hashed
//! through [`OrderedFloat`].

use crate::error::{CostOptimizationError, CostOptimizationResult};
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Number of hour-of-day buckets in a price profile
pub const HOURS_PER_DAY: usize = 24;

/// Seconds per hour, used to convert job durations
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Supported cloud providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    /// Amazon Web Services
    Aws,
    /// Microsoft Azure
    Azure,
}

impl CloudProvider {
    /// Regions searched when a request does not name any
    pub fn default_regions(&self) -> Vec<String> {
        let regions: &[&str] = match self {
            CloudProvider::Aws => &[
                "eu-central-1",
                "eu-west-1",
                "eu-west-2",
                "eu-west-3",
                "eu-north-1",
            ],
            CloudProvider::Azure => &[
                "germanywestcentral",
                "northeurope",
                "westeurope",
                "francecentral",
                "polandcentral",
                "swedencentral",
            ],
        };
        regions.iter().map(|r| r.to_string()).collect()
    }

    /// Currency symbol the provider's spot prices are reported in
    pub fn currency_symbol(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "$",
            CloudProvider::Azure => "€",
        }
    }

    /// Normalize an instance name to the form the price history uses.
    ///
    /// Azure ARM SKU names (`Standard_E2s_v5`) are stored as their spot
    /// display names (`E2s v5 spot`). AWS names are used verbatim.
    pub fn normalize_instance_name(&self, name: &str) -> String {
        match self {
            CloudProvider::Azure => match name.strip_prefix("Standard") {
                Some(rest) => format!("{} spot", rest.replace('_', " ").trim()),
                None => name.to_string(),
            },
            CloudProvider::Aws => name.to_string(),
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "AWS"),
            CloudProvider::Azure => write!(f, "Azure"),
        }
    }
}

impl FromStr for CloudProvider {
    type Err = CostOptimizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            other => Err(CostOptimizationError::invalid_input(
                "provider",
                format!("unknown provider '{other}'"),
            )),
        }
    }
}

/// One historical spot price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Instance type, e.g. `m5.large`
    pub instance_type: String,
    /// Region the price was observed in
    pub region: String,
    /// Hour of day (0-23, UTC)
    pub hour_of_day: u32,
    /// Price per instance-hour
    pub price: f64,
    /// Observation time
    pub observed_at: DateTime<Utc>,
}

/// Price estimate with lower and upper confidence bounds.
///
/// `{0, 0, 0}` is the "no data" sentinel, never a free resource.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound
    pub low: f64,
    /// Point estimate
    pub mean: f64,
    /// Upper bound
    pub high: f64,
}

impl ConfidenceInterval {
    /// The "no usable data" sentinel
    pub const ZERO: Self = Self {
        low: 0.0,
        mean: 0.0,
        high: 0.0,
    };

    /// Create an interval
    pub fn new(low: f64, mean: f64, high: f64) -> Self {
        Self { low, mean, high }
    }

    /// Degenerate interval with all three components equal
    pub fn point(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// True for the zero sentinel (no mean price)
    pub fn is_sentinel(&self) -> bool {
        self.mean == 0.0
    }

    /// Multiply every component by `factor`
    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.low * factor, self.mean * factor, self.high * factor)
    }

    /// Width of the interval
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

impl Add for ConfidenceInterval {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.low + rhs.low, self.mean + rhs.mean, self.high + rhs.high)
    }
}

impl AddAssign for ConfidenceInterval {
    fn add_assign(&mut self, rhs: Self) {
        self.low += rhs.low;
        self.mean += rhs.mean;
        self.high += rhs.high;
    }
}

/// Expected cost of one slot for one (instance, region, parallel factor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostQuote {
    /// Lower bound of the total cost
    pub cost_low: f64,
    /// Expected total cost
    pub cost_mean: f64,
    /// Upper bound of the total cost
    pub cost_high: f64,
    /// Reported start hour; fractional when the partial hour comes first
    pub start_hour: f64,
    /// Per-instance duration in hours (already divided by the factor)
    pub duration_hours: f64,
    /// Compute region
    pub region: String,
    /// Number of parallel instances
    pub parallel_factor: u32,
}

impl CostQuote {
    /// Cost triple as an interval
    pub fn interval(&self) -> ConfidenceInterval {
        ConfidenceInterval::new(self.cost_low, self.cost_mean, self.cost_high)
    }
}

/// Compute cost map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputeKey {
    /// Compute region
    pub region: String,
    /// Instance type
    pub instance_type: String,
    /// Reported start hour
    pub start_hour: OrderedFloat<f64>,
    /// Parallel factor
    pub parallel_factor: u32,
}

/// Compute cost map value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputeCost {
    /// Lower bound
    pub cost_low: f64,
    /// Expected cost
    pub cost_mean: f64,
    /// Upper bound
    pub cost_high: f64,
    /// Per-instance duration in hours
    pub duration_hours: f64,
}

impl From<&CostQuote> for ComputeCost {
    fn from(quote: &CostQuote) -> Self {
        Self {
            cost_low: quote.cost_low,
            cost_mean: quote.cost_mean,
            cost_high: quote.cost_high,
            duration_hours: quote.duration_hours,
        }
    }
}

/// Storage cost map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    /// Storage region
    pub region: String,
    /// Instance type of the job
    pub instance_type: String,
    /// Parallel factor
    pub parallel_factor: u32,
    /// Per-instance job duration the data is kept for; matches the
    /// `duration_hours` of that job's compute costs
    pub duration_hours: OrderedFloat<f64>,
}

impl StorageKey {
    /// Create a key
    pub fn new(
        region: impl Into<String>,
        instance_type: impl Into<String>,
        parallel_factor: u32,
        duration_hours: f64,
    ) -> Self {
        Self {
            region: region.into(),
            instance_type: instance_type.into(),
            parallel_factor,
            duration_hours: OrderedFloat(duration_hours),
        }
    }
}

/// Transfer cost map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransferKey {
    /// Source (storage) region
    pub from: String,
    /// Destination (compute) region
    pub to: String,
}

impl TransferKey {
    /// Create a key
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Source and destination are the same region
    pub fn is_intra_region(&self) -> bool {
        self.from == self.to
    }
}

/// A job to place: instance type plus estimated run time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Instance type
    pub instance_type: String,
    /// Run time on one instance, in seconds
    pub duration_seconds: f64,
}

impl JobDescriptor {
    /// Create a job descriptor
    pub fn new(instance_type: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            instance_type: instance_type.into(),
            duration_seconds,
        }
    }

    /// Run time in hours
    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds / SECONDS_PER_HOUR
    }
}

/// Storage requirements of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRequest {
    /// Volume in GB
    pub volume_gb: f64,
    /// Premium (SSD) tier
    #[serde(default)]
    pub premium: bool,
    /// Locally redundant (LRS) instead of zone redundant (ZRS); Azure only
    #[serde(default = "default_locally_redundant")]
    pub locally_redundant: bool,
}

fn default_locally_redundant() -> bool {
    true
}

/// Monthly unit price of a storage SKU in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPrice {
    /// Region
    pub region: String,
    /// Monthly price
    pub price: f64,
}

/// Validate a confidence level in percent
pub fn validate_confidence_level(confidence_level: f64) -> CostOptimizationResult<()> {
    if confidence_level.is_finite() && confidence_level > 0.0 && confidence_level < 100.0 {
        Ok(())
    } else {
        Err(CostOptimizationError::invalid_input(
            "confidence_level",
            format!("{confidence_level} is not in (0, 100)"),
        ))
    }
}
