//! Price collaborators consumed by the cost map builder
//!
//! The engine only reads through these traits. [`InMemoryPriceStore`] backs
//! them with a JSON snapshot for the CLI, benchmarks and tests.

use crate::error::CostOptimizationResult;
use crate::types::{CloudProvider, PricePoint, RegionPrice, HOURS_PER_DAY};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Historical spot price observations
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Observations for one hour-of-day bucket
    async fn sample_hour(
        &self,
        instance_type: &str,
        region: &str,
        hour: u32,
    ) -> CostOptimizationResult<Vec<PricePoint>>;

    /// Observations for the whole day
    async fn sample_all_hours(
        &self,
        instance_type: &str,
        region: &str,
    ) -> CostOptimizationResult<Vec<PricePoint>> {
        let mut points = Vec::new();
        for hour in 0..HOURS_PER_DAY as u32 {
            points.extend(self.sample_hour(instance_type, region, hour).await?);
        }
        Ok(points)
    }
}

/// Monthly storage unit prices
#[async_trait]
pub trait StoragePriceSource: Send + Sync {
    /// Price of `sku` in every region that offers it
    async fn lookup(
        &self,
        provider: CloudProvider,
        sku: &str,
    ) -> CostOptimizationResult<Vec<RegionPrice>>;
}

/// Inter-region transfer prices
#[async_trait]
pub trait TransferPriceSource: Send + Sync {
    /// Price per GB from `from` to `to`, `None` when unknown
    async fn lookup(
        &self,
        provider: CloudProvider,
        from: &str,
        to: &str,
    ) -> CostOptimizationResult<Option<f64>>;
}

/// Storage SKU price in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoragePrice {
    /// Provider
    pub provider: CloudProvider,
    /// SKU name, e.g. `P10 LRS` or `gp3`
    pub sku: String,
    /// Region
    pub region: String,
    /// Monthly unit price
    pub price: f64,
}

/// Known transfer price between two regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPrice {
    /// Provider
    pub provider: CloudProvider,
    /// Source region
    pub from: String,
    /// Destination region
    pub to: String,
    /// Price per GB
    pub price_per_gb: f64,
}

/// Serializable set of prices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Spot price history
    #[serde(default)]
    pub price_points: Vec<PricePoint>,
    /// Storage SKU prices
    #[serde(default)]
    pub storage_prices: Vec<StoragePrice>,
    /// Transfer prices
    #[serde(default)]
    pub transfer_prices: Vec<TransferPrice>,
}

impl PriceSnapshot {
    /// Parse a JSON snapshot
    pub fn from_json(json: &str) -> CostOptimizationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> CostOptimizationResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }
}

/// Snapshot-backed implementation of all three price sources
#[derive(Debug, Default)]
pub struct InMemoryPriceStore {
    snapshot: RwLock<PriceSnapshot>,
}

impl InMemoryPriceStore {
    /// Create a store from a snapshot
    pub fn new(snapshot: PriceSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Create a store from a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> CostOptimizationResult<Self> {
        Ok(Self::new(PriceSnapshot::load(path)?))
    }

    /// Append spot price observations
    pub fn add_price_points(&self, points: impl IntoIterator<Item = PricePoint>) {
        self.snapshot.write().price_points.extend(points);
    }

    /// Add or replace a storage price
    pub fn set_storage_price(&self, price: StoragePrice) {
        let mut snapshot = self.snapshot.write();
        snapshot.storage_prices.retain(|p| {
            !(p.provider == price.provider
                && p.region == price.region
                && p.sku.eq_ignore_ascii_case(&price.sku))
        });
        snapshot.storage_prices.push(price);
    }

    /// Add or replace a transfer price
    pub fn set_transfer_price(&self, price: TransferPrice) {
        let mut snapshot = self.snapshot.write();
        snapshot.transfer_prices.retain(|p| {
            !(p.provider == price.provider && p.from == price.from && p.to == price.to)
        });
        snapshot.transfer_prices.push(price);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> PriceSnapshot {
        self.snapshot.read().clone()
    }

    /// Number of spot price observations
    pub fn price_point_count(&self) -> usize {
        self.snapshot.read().price_points.len()
    }
}

#[async_trait]
impl PriceSource for InMemoryPriceStore {
    async fn sample_hour(
        &self,
        instance_type: &str,
        region: &str,
        hour: u32,
    ) -> CostOptimizationResult<Vec<PricePoint>> {
        Ok(self
            .snapshot
            .read()
            .price_points
            .iter()
            .filter(|p| {
                p.instance_type == instance_type && p.region == region && p.hour_of_day == hour
            })
            .cloned()
            .collect())
    }

    async fn sample_all_hours(
        &self,
        instance_type: &str,
        region: &str,
    ) -> CostOptimizationResult<Vec<PricePoint>> {
        Ok(self
            .snapshot
            .read()
            .price_points
            .iter()
            .filter(|p| p.instance_type == instance_type && p.region == region)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoragePriceSource for InMemoryPriceStore {
    async fn lookup(
        &self,
        provider: CloudProvider,
        sku: &str,
    ) -> CostOptimizationResult<Vec<RegionPrice>> {
        Ok(self
            .snapshot
            .read()
            .storage_prices
            .iter()
            .filter(|p| p.provider == provider && p.sku.eq_ignore_ascii_case(sku))
            .map(|p| RegionPrice {
                region: p.region.clone(),
                price: p.price,
            })
            .collect())
    }
}

#[async_trait]
impl TransferPriceSource for InMemoryPriceStore {
    async fn lookup(
        &self,
        provider: CloudProvider,
        from: &str,
        to: &str,
    ) -> CostOptimizationResult<Option<f64>> {
        Ok(self
            .snapshot
            .read()
            .transfer_prices
            .iter()
            .find(|p| p.provider == provider && p.from == from && p.to == to)
            .map(|p| p.price_per_gb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(instance: &str, region: &str, hour: u32, price: f64) -> PricePoint {
        PricePoint {
            instance_type: instance.to_string(),
            region: region.to_string(),
            hour_of_day: hour,
            price,
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sample_hour_filters() {
        let store = InMemoryPriceStore::default();
        store.add_price_points(vec![
            point("m5.large", "eu-west-1", 3, 0.1),
            point("m5.large", "eu-west-1", 4, 0.2),
            point("m5.large", "eu-west-2", 3, 0.3),
            point("c5.large", "eu-west-1", 3, 0.4),
        ]);

        let points = store.sample_hour("m5.large", "eu-west-1", 3).await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].price, 0.1);

        let all = store.sample_all_hours("m5.large", "eu-west-1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.price_point_count(), 4);
    }

    struct HourlyOnly;

    #[async_trait]
    impl PriceSource for HourlyOnly {
        async fn sample_hour(
            &self,
            instance_type: &str,
            region: &str,
            hour: u32,
        ) -> CostOptimizationResult<Vec<PricePoint>> {
            Ok(vec![point(instance_type, region, hour, hour as f64)])
        }
    }

    #[tokio::test]
    async fn test_default_sample_all_hours_visits_every_hour() {
        let points = HourlyOnly.sample_all_hours("m5.large", "eu-west-1").await.unwrap();
        assert_eq!(points.len(), 24);
        assert_eq!(points[23].hour_of_day, 23);
    }

    #[tokio::test]
    async fn test_storage_lookup_is_case_insensitive() {
        let store = InMemoryPriceStore::default();
        store.set_storage_price(StoragePrice {
            provider: CloudProvider::Azure,
            sku: "P15 LRS".to_string(),
            region: "westeurope".to_string(),
            price: 30.0,
        });
        store.set_storage_price(StoragePrice {
            provider: CloudProvider::Azure,
            sku: "p15 lrs".to_string(),
            region: "westeurope".to_string(),
            price: 28.0,
        });

        let prices = StoragePriceSource::lookup(&store, CloudProvider::Azure, "P15 LRS")
            .await
            .unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].price, 28.0);

        let none = StoragePriceSource::lookup(&store, CloudProvider::Aws, "P15 LRS")
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_transfer_lookup() {
        let store = InMemoryPriceStore::default();
        store.set_transfer_price(TransferPrice {
            provider: CloudProvider::Aws,
            from: "eu-west-1".to_string(),
            to: "eu-central-1".to_string(),
            price_per_gb: 0.02,
        });

        let known =
            TransferPriceSource::lookup(&store, CloudProvider::Aws, "eu-west-1", "eu-central-1")
                .await
                .unwrap();
        assert_eq!(known, Some(0.02));

        let reverse =
            TransferPriceSource::lookup(&store, CloudProvider::Aws, "eu-central-1", "eu-west-1")
                .await
                .unwrap();
        assert_eq!(reverse, None);
    }

    #[test]
    fn test_snapshot_json() {
        let json = r#"{
            "price_points": [
                {"instance_type": "m5.large", "region": "eu-west-1", "hour_of_day": 2,
                 "price": 0.05, "observed_at": "2024-03-01T02:00:00Z"}
            ],
            "storage_prices": [
                {"provider": "aws", "sku": "gp3", "region": "eu-west-1", "price": 0.088}
            ]
        }"#;
        let snapshot = PriceSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.price_points.len(), 1);
        assert_eq!(snapshot.storage_prices[0].provider, CloudProvider::Aws);
        assert!(snapshot.transfer_prices.is_empty());

        assert!(PriceSnapshot::from_json("{not json").is_err());
    }
}
