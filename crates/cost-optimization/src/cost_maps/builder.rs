//! Concurrent construction of the three cost maps
//!
//! Every (region, instance type) pair is fetched and evaluated in its own
//! task. A semaphore caps in-flight collaborator calls and each task returns
//! its own partial result, so nothing is shared until the merge.

use super::{ComputeCostMap, StorageCostMap, StorageSku, TransferCostMap, TransferPolicy};
use crate::config::OptimizerConfig;
use crate::error::{CostOptimizationError, CostOptimizationResult};
use crate::profile::HourlyPriceProfile;
use crate::slot_search::SlotSearch;
use crate::sources::{InMemoryPriceStore, PriceSource, StoragePriceSource, TransferPriceSource};
use crate::types::{
    CloudProvider, CostQuote, JobDescriptor, RegionPrice, StorageRequest, TransferKey,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Key counts of the three maps, reported when no chain can be formed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapSizes {
    /// Compute map keys
    pub compute: usize,
    /// Storage map keys
    pub storage: usize,
    /// Transfer map keys
    pub transfer: usize,
}

impl MapSizes {
    /// `NoFeasibleChain` for the given stage
    pub fn no_feasible_chain(&self, stage: &str) -> CostOptimizationError {
        CostOptimizationError::NoFeasibleChain {
            stage: stage.to_string(),
            compute_entries: self.compute,
            storage_entries: self.storage,
            transfer_entries: self.transfer,
        }
    }
}

/// All three maps for one request
#[derive(Debug, Clone)]
pub struct CostMaps {
    /// Compute costs
    pub compute: ComputeCostMap,
    /// Storage costs
    pub storage: StorageCostMap,
    /// Transfer rates
    pub transfer: TransferCostMap,
    /// Storage SKU the storage costs were looked up for
    pub storage_sku: StorageSku,
}

impl CostMaps {
    /// Key counts
    pub fn sizes(&self) -> MapSizes {
        MapSizes {
            compute: self.compute.len(),
            storage: self.storage.len(),
            transfer: self.transfer.len(),
        }
    }
}

/// Builds cost maps from price collaborators
#[derive(Clone)]
pub struct CostMapBuilder {
    prices: Arc<dyn PriceSource>,
    storage: Arc<dyn StoragePriceSource>,
    transfer: Arc<dyn TransferPriceSource>,
    config: Arc<OptimizerConfig>,
}

impl CostMapBuilder {
    /// Create a builder over three collaborators
    pub fn new(
        prices: Arc<dyn PriceSource>,
        storage: Arc<dyn StoragePriceSource>,
        transfer: Arc<dyn TransferPriceSource>,
        config: Arc<OptimizerConfig>,
    ) -> Self {
        Self {
            prices,
            storage,
            transfer,
            config,
        }
    }

    /// Create a builder backed entirely by one in-memory store
    pub fn from_store(store: Arc<InMemoryPriceStore>, config: Arc<OptimizerConfig>) -> Self {
        Self::new(store.clone(), store.clone(), store, config)
    }

    /// Active configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Fetch the history of one pair and build its profile
    pub async fn fetch_profile(
        &self,
        instance_type: &str,
        region: &str,
        confidence_level: f64,
    ) -> CostOptimizationResult<HourlyPriceProfile> {
        let points = self
            .prices
            .sample_all_hours(instance_type, region)
            .await
            .map_err(upstream("price source"))?;
        Ok(HourlyPriceProfile::build(&points, confidence_level))
    }

    /// Slot costs for every (region, job, parallel factor).
    ///
    /// Jobs sharing an instance type share one fetch. Priceless pairs are
    /// skipped; a failing fetch fails the whole map.
    pub async fn build_compute_map(
        &self,
        regions: &[String],
        jobs: &[JobDescriptor],
        parallel_factors: &[u32],
        confidence_level: f64,
    ) -> CostOptimizationResult<ComputeCostMap> {
        let mut durations: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for job in jobs {
            durations
                .entry(job.instance_type.as_str())
                .or_default()
                .push(job.duration_hours());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight_fetches.max(1)));
        let search = SlotSearch::new(self.config.slot_search());
        let factors: Arc<[u32]> = parallel_factors.into();
        let mut tasks = JoinSet::new();

        for region in unique(regions) {
            for (instance_type, hours) in &durations {
                let semaphore = Arc::clone(&semaphore);
                let prices = Arc::clone(&self.prices);
                let factors = Arc::clone(&factors);
                let region = region.clone();
                let instance_type = instance_type.to_string();
                let hours = hours.clone();

                tasks.spawn(async move {
                    let points = {
                        let _permit = semaphore.acquire_owned().await.map_err(|e| {
                            CostOptimizationError::TaskFailed {
                                reason: e.to_string(),
                            }
                        })?;
                        prices
                            .sample_all_hours(&instance_type, &region)
                            .await
                            .map_err(upstream("price source"))?
                    };

                    let profile = HourlyPriceProfile::build(&points, confidence_level);
                    if profile.is_priceless() {
                        debug!("No usable prices for {} in {}, skipping", instance_type, region);
                        return Ok((instance_type, Vec::new()));
                    }

                    let quotes: Vec<CostQuote> = hours
                        .iter()
                        .flat_map(|&h| search.find_all_slots(&profile, &region, h, &factors))
                        .collect();
                    Ok::<_, CostOptimizationError>((instance_type, quotes))
                });
            }
        }

        let mut map = ComputeCostMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (instance_type, quotes) = joined.map_err(task_failed)??;
            for quote in &quotes {
                map.insert_quote(&instance_type, quote);
            }
        }
        map.sort_entries();

        debug!("Compute cost map holds {} keys", map.len());
        Ok(map)
    }

    /// Storage costs for the resolved SKU in every requested region that
    /// offers it
    pub async fn build_storage_map(
        &self,
        provider: CloudProvider,
        storage_request: &StorageRequest,
        regions: &[String],
        jobs: &[JobDescriptor],
        parallel_factors: &[u32],
    ) -> CostOptimizationResult<(StorageSku, StorageCostMap)> {
        let sku = StorageSku::resolve(provider, storage_request)?;
        let prices: Vec<RegionPrice> = self
            .storage
            .lookup(provider, sku.name())
            .await
            .map_err(upstream("storage price source"))?
            .into_iter()
            .filter(|p| regions.contains(&p.region))
            .collect();

        if prices.is_empty() {
            warn!("No {} storage prices for SKU {} in the requested regions", provider, sku);
        }

        let map = StorageCostMap::from_prices(
            &prices,
            jobs,
            parallel_factors,
            self.config.hours_per_month,
        );
        Ok((sku, map))
    }

    /// Transfer rates between every ordered pair of regions
    pub async fn build_transfer_map(
        &self,
        provider: CloudProvider,
        regions: &[String],
    ) -> CostOptimizationResult<TransferCostMap> {
        let regions = unique(regions);

        let default_rate = match TransferPolicy::for_provider(provider, &self.config) {
            TransferPolicy::Flat { rate_per_gb } => {
                return Ok(TransferCostMap::flat(&regions, rate_per_gb));
            }
            TransferPolicy::Lookup {
                default_rate_per_gb,
            } => default_rate_per_gb,
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight_fetches.max(1)));
        let mut tasks = JoinSet::new();
        let mut map = TransferCostMap::new();

        for from in &regions {
            for to in &regions {
                let key = TransferKey::new(from.as_str(), to.as_str());
                if key.is_intra_region() {
                    map.insert(key, 0.0);
                    continue;
                }

                let semaphore = Arc::clone(&semaphore);
                let source = Arc::clone(&self.transfer);
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        CostOptimizationError::TaskFailed {
                            reason: e.to_string(),
                        }
                    })?;
                    let rate = source
                        .lookup(provider, &key.from, &key.to)
                        .await
                        .map_err(upstream("transfer price source"))?;
                    Ok::<_, CostOptimizationError>((key, rate))
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (key, rate) = joined.map_err(task_failed)??;
            let rate = match rate {
                Some(rate) if rate.is_finite() && rate >= 0.0 => rate,
                _ => {
                    debug!(
                        "No transfer price {} -> {}, using {}",
                        key.from, key.to, default_rate
                    );
                    default_rate
                }
            };
            map.insert(key, rate);
        }

        Ok(map)
    }

    /// Build all three maps concurrently
    pub async fn build_all(
        &self,
        provider: CloudProvider,
        regions: &[String],
        jobs: &[JobDescriptor],
        parallel_factors: &[u32],
        confidence_level: f64,
        storage_request: &StorageRequest,
    ) -> CostOptimizationResult<CostMaps> {
        let (compute, (storage_sku, storage), transfer) = tokio::try_join!(
            self.build_compute_map(regions, jobs, parallel_factors, confidence_level),
            self.build_storage_map(provider, storage_request, regions, jobs, parallel_factors),
            self.build_transfer_map(provider, regions),
        )?;

        let maps = CostMaps {
            compute,
            storage,
            transfer,
            storage_sku,
        };
        let sizes = maps.sizes();
        info!(
            "Built cost maps for {}: {} compute, {} storage, {} transfer entries",
            provider, sizes.compute, sizes.storage, sizes.transfer
        );
        Ok(maps)
    }
}

/// Wrap collaborator failures so callers see which collaborator failed
fn upstream(collaborator: &'static str) -> impl Fn(CostOptimizationError) -> CostOptimizationError {
    move |error| match error {
        error @ CostOptimizationError::UpstreamUnavailable { .. } => error,
        other => CostOptimizationError::UpstreamUnavailable {
            collaborator: collaborator.to_string(),
            reason: other.to_string(),
        },
    }
}

fn task_failed(error: JoinError) -> CostOptimizationError {
    CostOptimizationError::TaskFailed {
        reason: error.to_string(),
    }
}

/// Deduplicate while keeping first-seen order
fn unique(regions: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(regions.len());
    for region in regions {
        if !seen.contains(region) {
            seen.push(region.clone());
        }
    }
    seen
}
