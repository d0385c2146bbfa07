//! Confidence interval estimation for hourly spot prices

use crate::types::ConfidenceInterval;
use statistical::{mean, standard_deviation};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Student-t confidence interval estimator
pub struct PriceStatistics;

impl PriceStatistics {
    /// Estimate the price of one hour-of-day bucket.
    ///
    /// Fewer than two samples yield the zero sentinel. The t-based margin is
    /// clamped to the observed sample range, so `low >= min(samples)` and
    /// `high <= max(samples)` always hold. Non-finite samples are ignored.
    pub fn estimate(samples: &[f64], confidence_level: f64) -> ConfidenceInterval {
        let finite: Vec<f64> = samples.iter().copied().filter(|p| p.is_finite()).collect();
        if finite.len() < 2 {
            return ConfidenceInterval::ZERO;
        }
        let samples = finite.as_slice();

        let n = samples.len() as f64;
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Summation rounding can push the mean of identical samples past max
        let avg = mean(samples).clamp(min, max);
        let std_dev = standard_deviation(samples, Some(avg));
        let standard_error = std_dev / n.sqrt();
        let margin = Self::critical_value(confidence_level, n - 1.0) * standard_error;

        ConfidenceInterval {
            low: (avg - margin).max(min),
            mean: avg,
            high: (avg + margin).min(max),
        }
    }

    /// Student-t quantile at `confidence_level` percent with the given
    /// degrees of freedom. Never negative.
    pub fn critical_value(confidence_level: f64, degrees_of_freedom: f64) -> f64 {
        let probability = (confidence_level / 100.0).clamp(0.0, 1.0);
        match StudentsT::new(0.0, 1.0, degrees_of_freedom) {
            Ok(dist) => {
                let t = dist.inverse_cdf(probability);
                if t.is_finite() {
                    t.max(0.0)
                } else {
                    0.0
                }
            }
            Err(_) => 0.0,
        }
    }
}
