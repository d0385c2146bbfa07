use async_trait::async_trait;
use chrono::Utc;
use spotcost_optimization::{
    ChainOptimizer, CloudProvider, ComputeCostMap, CostOptimizationError, CostOptimizationResult,
    CostQuote, InMemoryPriceStore, JobDescriptor, OptimizationRequest, OptimizerConfig,
    PlacementPlanner, PricePoint, PriceSnapshot, PriceSource, StorageCostMap, StorageKey,
    StoragePrice, StorageRequest, TransferCostMap, TransferKey, TransferPrice,
};
use std::io::Write;
use std::sync::Arc;

/// Two identical observations per hour so every interval collapses to the
/// given price
fn hourly_points(instance: &str, region: &str, prices: [f64; 24]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .flat_map(|(hour, &price)| {
            (0..2).map(move |_| PricePoint {
                instance_type: instance.to_string(),
                region: region.to_string(),
                hour_of_day: hour as u32,
                price,
                observed_at: Utc::now(),
            })
        })
        .collect()
}

fn storage_price(provider: CloudProvider, sku: &str, region: &str, price: f64) -> StoragePrice {
    StoragePrice {
        provider,
        sku: sku.to_string(),
        region: region.to_string(),
        price,
    }
}

fn aws_request(regions: &[&str], jobs: Vec<JobDescriptor>) -> OptimizationRequest {
    OptimizationRequest {
        provider: CloudProvider::Aws,
        jobs,
        confidence_level: 95.0,
        storage: StorageRequest {
            volume_gb: 100.0,
            premium: true,
            locally_redundant: true,
        },
        parallel_factors: vec![1],
        regions: Some(regions.iter().map(|r| r.to_string()).collect()),
        max_total_cost: None,
    }
}

/// A: storage 10 and compute 20 for a 10 hour job. B: storage 2, no compute.
/// C: compute 2, no storage. Every cross-region move costs 50 for 100 GB.
fn three_region_store() -> Arc<InMemoryPriceStore> {
    let mut snapshot = PriceSnapshot::default();
    snapshot.price_points.extend(hourly_points("m5.large", "A", [2.0; 24]));
    snapshot.price_points.extend(hourly_points("m5.large", "C", [0.2; 24]));
    snapshot.storage_prices.push(storage_price(CloudProvider::Aws, "gp3", "A", 730.0));
    snapshot.storage_prices.push(storage_price(CloudProvider::Aws, "gp3", "B", 146.0));
    for from in ["A", "B", "C"] {
        for to in ["A", "B", "C"] {
            if from != to {
                snapshot.transfer_prices.push(TransferPrice {
                    provider: CloudProvider::Aws,
                    from: from.to_string(),
                    to: to.to_string(),
                    price_per_gb: 0.5,
                });
            }
        }
    }
    Arc::new(InMemoryPriceStore::new(snapshot))
}

#[tokio::test]
async fn test_cheap_morning_window_selected() {
    let mut prices = [5.0; 24];
    prices[8..12].fill(1.0);
    let store = Arc::new(InMemoryPriceStore::new(PriceSnapshot {
        price_points: hourly_points("m5.large", "eu-west-1", prices),
        ..PriceSnapshot::default()
    }));
    let planner = PlacementPlanner::from_store(store, OptimizerConfig::default());

    let request = aws_request(&["eu-west-1"], vec![JobDescriptor::new("m5.large", 3.0 * 3600.0)]);
    let report = planner.estimate_jobs(&request).await.unwrap();

    let estimate = &report.estimates[0];
    assert!(estimate.start_hour == 8.0 || estimate.start_hour == 9.0);
    assert_eq!(estimate.cost_mean, 3.0);
    assert_eq!(estimate.region, "eu-west-1");
    assert!(report.storage.is_none());
}

#[tokio::test]
async fn test_same_region_chain_beats_cheaper_remote_compute() {
    let mut compute = ComputeCostMap::new();
    for (region, mean) in [("A", 20.0), ("C", 2.0)] {
        compute.insert_quote(
            "m5.large",
            &CostQuote {
                cost_low: mean,
                cost_mean: mean,
                cost_high: mean,
                start_hour: 0.0,
                duration_hours: 10.0,
                region: region.to_string(),
                parallel_factor: 1,
            },
        );
    }
    compute.sort_entries();

    let mut storage = StorageCostMap::default();
    for (region, cost) in [("A", 10.0), ("B", 2.0)] {
        storage.insert(StorageKey::new(region, "m5.large", 1, 10.0), cost);
    }

    let mut transfer = TransferCostMap::new();
    for from in ["A", "B", "C"] {
        for to in ["A", "B", "C"] {
            transfer.insert(TransferKey::new(from, to), 0.5);
        }
    }

    let optimizer = ChainOptimizer::new(&OptimizerConfig::default());
    let chain = optimizer
        .optimize(&compute, &storage, &transfer, 100.0)
        .await
        .unwrap();
    assert_eq!(chain.storage_region, "A");
    assert_eq!(chain.compute_region, "A");
    assert_eq!(chain.total_cost, 30.0);

    let ranked = optimizer
        .optimize_ranked(&compute, &storage, &transfer, 100.0, 10)
        .unwrap();
    let totals: Vec<f64> = ranked.iter().map(|c| c.total_cost).collect();
    // A->A, B->C, A->C, B->A
    assert_eq!(totals, vec![30.0, 54.0, 62.0, 72.0]);
}

#[tokio::test]
async fn test_planner_selects_cheapest_chain() {
    let planner = PlacementPlanner::from_store(three_region_store(), OptimizerConfig::default());
    let request = aws_request(&["A", "B", "C"], vec![JobDescriptor::new("m5.large", 36_000.0)]);

    let response = planner.optimize(&request).await.unwrap();
    let chain = &response.chain;
    assert_eq!(chain.storage_region, "A");
    assert_eq!(chain.compute_region, "A");
    assert!((chain.total_cost - 30.0).abs() < 1e-9);
    assert_eq!(chain.breakdown.transfer, 0.0);
    assert_eq!(chain.start_hour, 0.0);
    assert_eq!(response.storage_sku, "gp3");
    assert_eq!(response.currency, "$");
    assert_eq!(response.alternatives[0], response.chain);
    // 24 starts in A reachable from A and B, 24 starts in C from A and B
    assert_eq!(response.candidate_count, 96);

    // every start hour in A ties at 30
    assert_eq!(response.alternatives.len(), 5);
    assert!(response
        .alternatives
        .iter()
        .all(|c| c.compute_region == "A" && (c.total_cost - 30.0).abs() < 1e-9));
}

/// Storage at 1 per hour and compute at 1 per hour in one region
fn flat_single_region_store() -> Arc<InMemoryPriceStore> {
    let mut snapshot = PriceSnapshot::default();
    snapshot.price_points.extend(hourly_points("m5.large", "A", [1.0; 24]));
    snapshot
        .storage_prices
        .push(storage_price(CloudProvider::Aws, "gp3", "A", 730.0));
    Arc::new(InMemoryPriceStore::new(snapshot))
}

#[tokio::test]
async fn test_jobs_sharing_an_instance_type_price_one_job_per_chain() {
    let short = JobDescriptor::new("m5.large", 3600.0);
    let long = JobDescriptor::new("m5.large", 36_000.0);
    let planner = PlacementPlanner::from_store(
        flat_single_region_store(),
        OptimizerConfig::default(),
    );

    for jobs in [vec![short.clone(), long.clone()], vec![long, short]] {
        let response = planner.optimize(&aws_request(&["A"], jobs)).await.unwrap();
        let chain = &response.chain;

        assert_eq!(chain.duration_hours, 1.0);
        assert!((chain.breakdown.storage - 1.0).abs() < 1e-9);
        assert!((chain.breakdown.compute_mean - 1.0).abs() < 1e-9);
        assert!((chain.total_cost - 2.0).abs() < 1e-9);
        // 24 starts for each of the two jobs
        assert_eq!(response.candidate_count, 48);
        for alternative in &response.alternatives {
            assert!((alternative.breakdown.storage - alternative.duration_hours).abs() < 1e-9);
        }
    }
}

#[tokio::test]
async fn test_priceless_compute_is_no_feasible_chain() {
    let mut snapshot = PriceSnapshot::default();
    snapshot.storage_prices.push(storage_price(CloudProvider::Aws, "gp3", "A", 730.0));
    let planner = PlacementPlanner::from_store(
        Arc::new(InMemoryPriceStore::new(snapshot)),
        OptimizerConfig::default(),
    );

    let request = aws_request(&["A", "B"], vec![JobDescriptor::new("m5.large", 3600.0)]);
    match planner.optimize(&request).await.unwrap_err() {
        CostOptimizationError::NoFeasibleChain {
            stage,
            compute_entries,
            storage_entries,
            transfer_entries,
        } => {
            assert_eq!(stage, "join");
            assert_eq!(compute_entries, 0);
            assert_eq!(storage_entries, 1);
            assert_eq!(transfer_entries, 4);
        }
        other => panic!("Expected NoFeasibleChain, got {other:?}"),
    }
}

#[tokio::test]
async fn test_budget_ceiling_excludes_every_chain() {
    let planner = PlacementPlanner::from_store(three_region_store(), OptimizerConfig::default());
    let mut request = aws_request(&["A", "B", "C"], vec![JobDescriptor::new("m5.large", 36_000.0)]);
    request.max_total_cost = Some(25.0);

    let error = planner.optimize(&request).await.unwrap_err();
    assert!(matches!(
        error,
        CostOptimizationError::NoFeasibleChain { ref stage, .. } if stage == "budget"
    ));

    request.max_total_cost = Some(31.0);
    let response = planner.optimize(&request).await.unwrap();
    assert!(response.chain.total_cost <= 31.0);
}

#[tokio::test]
async fn test_expired_solver_deadline_is_non_optimal() {
    let config = OptimizerConfig {
        solver_timeout_secs: 0,
        ..OptimizerConfig::default()
    };
    let planner = PlacementPlanner::from_store(three_region_store(), config);
    let request = aws_request(&["A", "B", "C"], vec![JobDescriptor::new("m5.large", 36_000.0)]);

    match planner.optimize(&request).await.unwrap_err() {
        CostOptimizationError::SolverNonOptimal { status, .. } => assert_eq!(status, "TimedOut"),
        other => panic!("Expected SolverNonOptimal, got {other:?}"),
    }
}

#[tokio::test]
async fn test_azure_flat_transfer_and_name_normalization() {
    let mut snapshot = PriceSnapshot::default();
    snapshot
        .price_points
        .extend(hourly_points("E2s v5 spot", "northeurope", [0.1; 24]));
    snapshot
        .storage_prices
        .push(storage_price(CloudProvider::Azure, "P15 LRS", "westeurope", 73.0));
    let planner = PlacementPlanner::from_store(
        Arc::new(InMemoryPriceStore::new(snapshot)),
        OptimizerConfig::default(),
    );

    let request = OptimizationRequest {
        provider: CloudProvider::Azure,
        jobs: vec![JobDescriptor::new("Standard_E2s_v5", 7200.0)],
        confidence_level: 90.0,
        storage: StorageRequest {
            volume_gb: 200.0,
            premium: true,
            locally_redundant: true,
        },
        parallel_factors: vec![1, 2],
        regions: None,
        max_total_cost: None,
    };

    let response = planner.optimize(&request).await.unwrap();
    assert_eq!(response.storage_sku, "P15 LRS");
    assert_eq!(response.currency, "€");
    assert_eq!(response.chain.storage_region, "westeurope");
    assert_eq!(response.chain.compute_region, "northeurope");
    assert_eq!(response.chain.instance_type, "E2s v5 spot");
    assert!((response.chain.breakdown.transfer - 0.0192 * 200.0).abs() < 1e-12);
}

struct UnreachableSource;

#[async_trait]
impl PriceSource for UnreachableSource {
    async fn sample_hour(
        &self,
        _instance_type: &str,
        _region: &str,
        _hour: u32,
    ) -> CostOptimizationResult<Vec<PricePoint>> {
        Err(CostOptimizationError::UpstreamUnavailable {
            collaborator: "price history".to_string(),
            reason: "timed out".to_string(),
        })
    }
}

#[tokio::test]
async fn test_upstream_failure_is_not_treated_as_missing_data() {
    let store = three_region_store();
    let config = Arc::new(OptimizerConfig::default());
    let builder = spotcost_optimization::CostMapBuilder::new(
        Arc::new(UnreachableSource),
        store.clone(),
        store,
        Arc::clone(&config),
    );
    let planner = PlacementPlanner::new(builder, config);
    let request = aws_request(&["A"], vec![JobDescriptor::new("m5.large", 3600.0)]);

    let error = planner.optimize(&request).await.unwrap_err();
    assert!(error.is_retryable());
    match error {
        CostOptimizationError::UpstreamUnavailable { collaborator, .. } => {
            assert_eq!(collaborator, "price history")
        }
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_multi_job_estimates_and_storage() {
    let planner = PlacementPlanner::from_store(three_region_store(), OptimizerConfig::default());
    let request = aws_request(
        &["A", "B", "C"],
        vec![
            JobDescriptor::new("m5.large", 36_000.0),
            JobDescriptor::new("m5.large", 18_000.0),
        ],
    );

    let report = planner.estimate_jobs(&request).await.unwrap();
    assert_eq!(report.estimates.len(), 2);
    assert!(report.estimates.iter().all(|e| e.region == "C"));
    assert!((report.totals.cost_mean - 3.0).abs() < 1e-9);
    assert_eq!(report.totals.duration_hours, 15.0);

    // cheapest storage is B (146 / 730 per hour over 15 hours), moved to C
    let storage = report.storage.unwrap();
    assert_eq!(storage.region, "B");
    assert!((storage.storage_cost - 3.0).abs() < 1e-9);
    assert!((storage.transfer_cost - 50.0).abs() < 1e-9);
    assert!((storage.total - 53.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_job_without_prices_fails_estimate() {
    let planner = PlacementPlanner::from_store(three_region_store(), OptimizerConfig::default());
    let request = aws_request(
        &["A", "C"],
        vec![
            JobDescriptor::new("m5.large", 3600.0),
            JobDescriptor::new("p3.2xlarge", 3600.0),
        ],
    );

    let error = planner.estimate_jobs(&request).await.unwrap_err();
    assert!(matches!(
        error,
        CostOptimizationError::NoFeasibleChain { ref stage, .. } if stage == "job_estimate"
    ));
}

#[tokio::test]
async fn test_invalid_request_rejected_before_fetching() {
    let planner = PlacementPlanner::from_store(three_region_store(), OptimizerConfig::default());
    let mut request = aws_request(&["A"], vec![JobDescriptor::new("m5.large", 3600.0)]);
    request.confidence_level = 0.0;

    assert!(matches!(
        planner.optimize(&request).await,
        Err(CostOptimizationError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn test_snapshot_file_round_trip_through_planner() {
    let store = three_region_store();
    let json = serde_json::to_string(&store.snapshot()).unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let loaded = Arc::new(InMemoryPriceStore::load(file.path()).unwrap());
    assert_eq!(loaded.price_point_count(), store.price_point_count());

    let planner = PlacementPlanner::from_store(loaded, OptimizerConfig::default());
    let request = aws_request(&["A", "B", "C"], vec![JobDescriptor::new("m5.large", 36_000.0)]);
    let response = planner.optimize(&request).await.unwrap();
    assert_eq!(response.chain.compute_region, "A");
}
