//! Compute cost map

use crate::types::{ComputeCost, ComputeKey, CostQuote};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// (region, instance, start hour, factor) to a list of slot costs.
///
/// Several jobs may share an instance type, so one key can hold more than
/// one cost. Lists are ordered cheapest first once [`Self::sort_entries`]
/// has run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeCostMap {
    entries: HashMap<ComputeKey, Vec<ComputeCost>>,
}

impl ComputeCostMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote under its key; non-positive quotes are ignored
    pub fn insert_quote(&mut self, instance_type: &str, quote: &CostQuote) {
        if !(quote.cost_mean.is_finite() && quote.cost_mean > 0.0) {
            return;
        }
        let key = ComputeKey {
            region: quote.region.clone(),
            instance_type: instance_type.to_string(),
            start_hour: OrderedFloat(quote.start_hour),
            parallel_factor: quote.parallel_factor,
        };
        self.entries.entry(key).or_default().push(ComputeCost::from(quote));
    }

    /// Order every list by mean cost, then duration
    pub fn sort_entries(&mut self) {
        for costs in self.entries.values_mut() {
            costs.sort_by(|a, b| {
                a.cost_mean
                    .total_cmp(&b.cost_mean)
                    .then(a.duration_hours.total_cmp(&b.duration_hours))
                    .then(a.cost_low.total_cmp(&b.cost_low))
            });
        }
    }

    /// Costs stored under `key`
    pub fn get(&self, key: &ComputeKey) -> Option<&[ComputeCost]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Cheapest cost stored under `key`
    pub fn cheapest(&self, key: &ComputeKey) -> Option<&ComputeCost> {
        self.entries.get(key).and_then(|costs| costs.first())
    }

    /// All entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&ComputeKey, &[ComputeCost])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(region: &str, start: f64, factor: u32, mean: f64, duration: f64) -> CostQuote {
        CostQuote {
            cost_low: mean * 0.9,
            cost_mean: mean,
            cost_high: mean * 1.1,
            start_hour: start,
            duration_hours: duration,
            region: region.to_string(),
            parallel_factor: factor,
        }
    }

    #[test]
    fn test_insert_and_sort() {
        let mut map = ComputeCostMap::new();
        map.insert_quote("m5.large", &quote("eu-west-1", 2.5, 1, 4.0, 3.0));
        map.insert_quote("m5.large", &quote("eu-west-1", 2.5, 1, 1.5, 1.0));
        map.insert_quote("m5.large", &quote("eu-west-1", 3.0, 2, 2.0, 1.5));
        map.sort_entries();

        assert_eq!(map.len(), 2);
        let key = ComputeKey {
            region: "eu-west-1".to_string(),
            instance_type: "m5.large".to_string(),
            start_hour: OrderedFloat(2.5),
            parallel_factor: 1,
        };
        let costs = map.get(&key).unwrap();
        assert_eq!(costs.len(), 2);
        assert_eq!(map.cheapest(&key).unwrap().cost_mean, 1.5);
    }

    #[test]
    fn test_non_positive_quotes_ignored() {
        let mut map = ComputeCostMap::new();
        map.insert_quote("m5.large", &quote("eu-west-1", 0.0, 1, 0.0, 3.0));
        map.insert_quote("m5.large", &quote("eu-west-1", 1.0, 1, -1.0, 3.0));
        map.insert_quote("m5.large", &quote("eu-west-1", 2.0, 1, f64::NAN, 3.0));
        assert!(map.is_empty());
    }
}
