//! Transfer cost map

use crate::config::OptimizerConfig;
use crate::types::{CloudProvider, TransferKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How off-diagonal transfer rates are obtained for a provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransferPolicy {
    /// Same per-GB rate between every pair of distinct regions
    Flat {
        /// Rate per GB
        rate_per_gb: f64,
    },
    /// Ask the transfer price source, falling back to a default rate
    Lookup {
        /// Rate per GB when the source has no price
        default_rate_per_gb: f64,
    },
}

impl TransferPolicy {
    /// Policy for a provider under the given configuration
    pub fn for_provider(provider: CloudProvider, config: &OptimizerConfig) -> Self {
        match config.flat_transfer_rate(provider) {
            Some(rate_per_gb) => TransferPolicy::Flat { rate_per_gb },
            None => TransferPolicy::Lookup {
                default_rate_per_gb: config.default_transfer_rate_per_gb,
            },
        }
    }
}

/// (from, to) to cost per GB; the diagonal is always zero
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferCostMap {
    rates: HashMap<TransferKey, f64>,
}

impl TransferCostMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Map for a region list with one rate between all distinct pairs
    pub fn flat(regions: &[String], rate_per_gb: f64) -> Self {
        let mut map = Self::new();
        for from in regions {
            for to in regions {
                map.insert(TransferKey::new(from.as_str(), to.as_str()), rate_per_gb);
            }
        }
        map
    }

    /// Insert a rate; intra-region keys always store zero
    pub fn insert(&mut self, key: TransferKey, rate_per_gb: f64) {
        let rate = if key.is_intra_region() { 0.0 } else { rate_per_gb };
        self.rates.insert(key, rate);
    }

    /// Rate per GB for a pair
    pub fn get(&self, from: &str, to: &str) -> Option<f64> {
        self.rates.get(&TransferKey::new(from, to)).copied()
    }

    /// All entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&TransferKey, f64)> {
        self.rates.iter().map(|(k, v)| (k, *v))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// No keys
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
