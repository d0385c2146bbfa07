//! Storage SKU resolution and storage cost map

use crate::error::{CostOptimizationError, CostOptimizationResult};
use crate::types::{CloudProvider, JobDescriptor, RegionPrice, StorageKey, StorageRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Divisor converting GB to GiB as used for disk tier lookup
pub const GB_PER_GIB: f64 = 1.074;

/// Azure managed disk tiers: (capacity in GiB, tier number)
const AZURE_DISK_TIERS: [(f64, u32); 14] = [
    (4.0, 1),
    (8.0, 2),
    (16.0, 3),
    (32.0, 4),
    (64.0, 6),
    (128.0, 10),
    (256.0, 15),
    (512.0, 20),
    (1024.0, 30),
    (2048.0, 40),
    (4096.0, 50),
    (8192.0, 60),
    (16384.0, 70),
    (32768.0, 80),
];

/// Storage SKU name as the storage price source knows it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageSku(String);

impl StorageSku {
    /// Pick the SKU for a request.
    ///
    /// Azure uses the smallest managed disk tier covering the volume
    /// (`P`/`E` prefix, `LRS`/`ZRS` suffix); volumes beyond the largest tier
    /// get the largest tier. AWS uses `gp3` for premium and `gp2` otherwise.
    pub fn resolve(
        provider: CloudProvider,
        request: &StorageRequest,
    ) -> CostOptimizationResult<Self> {
        if !(request.volume_gb.is_finite() && request.volume_gb > 0.0) {
            return Err(CostOptimizationError::invalid_input(
                "storage.volume_gb",
                format!("{} must be positive", request.volume_gb),
            ));
        }

        let name = match provider {
            CloudProvider::Azure => {
                let volume_gib = request.volume_gb / GB_PER_GIB;
                let tier = AZURE_DISK_TIERS
                    .iter()
                    .find(|(capacity, _)| *capacity >= volume_gib)
                    .or(AZURE_DISK_TIERS.last())
                    .map_or(80, |(_, tier)| *tier);
                let prefix = if request.premium { "P" } else { "E" };
                let redundancy = if request.locally_redundant { "LRS" } else { "ZRS" };
                format!("{prefix}{tier} {redundancy}")
            }
            CloudProvider::Aws if request.premium => "gp3".to_string(),
            CloudProvider::Aws => "gp2".to_string(),
        };
        Ok(Self(name))
    }

    /// SKU name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// (region, instance, factor, per-instance duration) to the storage cost of
/// keeping the data for that duration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageCostMap {
    entries: HashMap<StorageKey, f64>,
}

impl StorageCostMap {
    /// Cost = monthly price / hours_per_month × (job hours / factor).
    ///
    /// Jobs sharing an instance type get one entry per distinct duration.
    /// Prices that are negative or not finite are skipped.
    pub fn from_prices(
        prices: &[RegionPrice],
        jobs: &[JobDescriptor],
        parallel_factors: &[u32],
        hours_per_month: f64,
    ) -> Self {
        let mut entries = HashMap::new();

        for price in prices {
            if !(price.price.is_finite() && price.price >= 0.0) {
                warn!("Skipping storage price {} in {}", price.price, price.region);
                continue;
            }
            let hourly = price.price / hours_per_month;
            for job in jobs {
                for &factor in parallel_factors.iter().filter(|&&f| f > 0) {
                    let hours = job.duration_hours() / factor as f64;
                    let key = StorageKey::new(
                        price.region.clone(),
                        job.instance_type.clone(),
                        factor,
                        hours,
                    );
                    entries.insert(key, hourly * hours);
                }
            }
        }

        Self { entries }
    }

    /// Insert a single cost
    pub fn insert(&mut self, key: StorageKey, cost: f64) {
        self.entries.insert(key, cost);
    }

    /// Cost stored under `key`
    pub fn get(&self, key: &StorageKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// All entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&StorageKey, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
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
