//! 24-hour price profiles for one (instance type, region) pair

use crate::statistics::PriceStatistics;
use crate::types::{ConfidenceInterval, PricePoint, HOURS_PER_DAY};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Confidence intervals for hours 0-23, zero sentinel where data is missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPriceProfile {
    hours: [ConfidenceInterval; HOURS_PER_DAY],
}

impl HourlyPriceProfile {
    /// Bucket observations by hour of day and estimate each bucket
    pub fn build(points: &[PricePoint], confidence_level: f64) -> Self {
        let mut buckets: [Vec<f64>; HOURS_PER_DAY] = std::array::from_fn(|_| Vec::new());

        for point in points {
            match buckets.get_mut(point.hour_of_day as usize) {
                Some(bucket) => bucket.push(point.price),
                None => warn!(
                    "Ignoring price for {} in {} with hour_of_day {}",
                    point.instance_type, point.region, point.hour_of_day
                ),
            }
        }

        Self::from_hourly_samples(&buckets, confidence_level)
    }

    /// Estimate from samples already bucketed by hour
    pub fn from_hourly_samples(samples: &[Vec<f64>; HOURS_PER_DAY], confidence_level: f64) -> Self {
        Self {
            hours: std::array::from_fn(|h| {
                PriceStatistics::estimate(&samples[h], confidence_level)
            }),
        }
    }

    /// Wrap precomputed intervals
    pub fn from_intervals(hours: [ConfidenceInterval; HOURS_PER_DAY]) -> Self {
        Self { hours }
    }

    /// Profile with degenerate intervals at the given mean prices
    pub fn from_means(means: [f64; HOURS_PER_DAY]) -> Self {
        Self {
            hours: means.map(ConfidenceInterval::point),
        }
    }

    /// Interval for one hour of day
    pub fn hour(&self, hour: usize) -> &ConfidenceInterval {
        &self.hours[hour % HOURS_PER_DAY]
    }

    /// All 24 intervals
    pub fn intervals(&self) -> &[ConfidenceInterval; HOURS_PER_DAY] {
        &self.hours
    }

    /// Mean prices only
    pub fn means(&self) -> [f64; HOURS_PER_DAY] {
        self.hours.map(|h| h.mean)
    }

    /// No hour carries a price; callers skip the pair entirely
    pub fn is_priceless(&self) -> bool {
        self.hours.iter().all(ConfidenceInterval::is_sentinel)
    }

    /// Number of hours with usable data
    pub fn priced_hours(&self) -> usize {
        self.hours.iter().filter(|h| !h.is_sentinel()).count()
    }

    /// Some, but not all, hours are missing
    pub fn has_gaps(&self) -> bool {
        self.priced_hours() < HOURS_PER_DAY
    }

    /// Every component of every hour multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            hours: self.hours.map(|h| h.scale(factor)),
        }
    }
}
