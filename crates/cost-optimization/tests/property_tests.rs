//! Property-based tests for price estimation, slot search and selection

use proptest::prelude::*;
use spotcost_optimization::{
    ChainOptimizer, ComputeCostMap, CostQuote, HourlyPriceProfile, MapSizes, MeanProfile,
    OptimizerConfig, PriceStatistics, SlotSearch, StorageCostMap, StorageKey, TransferCostMap,
    TransferKey,
};

// Hourly prices, all hours populated
prop_compose! {
    fn arb_prices()(prices in prop::array::uniform24(0.01f64..10.0)) -> [f64; 24] {
        prices
    }
}

// Price samples for one hour bucket
prop_compose! {
    fn arb_samples()(samples in prop::collection::vec(0.001f64..5.0, 2..40)) -> Vec<f64> {
        samples
    }
}

// Durations with a fractional part
prop_compose! {
    fn arb_fractional_duration()(whole in 0u32..30, fraction in 0.01f64..0.99) -> f64 {
        whole as f64 + fraction
    }
}

fn brute_force_cheapest(prices: &[f64; 24], hours: usize) -> f64 {
    (0..24)
        .map(|s| (0..hours).map(|k| prices[(s + k) % 24]).sum::<f64>())
        .fold(f64::INFINITY, f64::min)
}

proptest! {
    #[test]
    fn prop_interval_ordered_and_within_range(
        samples in arb_samples(),
        confidence in 1.0f64..99.9,
    ) {
        let interval = PriceStatistics::estimate(&samples, confidence);
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        prop_assert!(interval.low <= interval.mean);
        prop_assert!(interval.mean <= interval.high);
        prop_assert!(interval.low >= min);
        prop_assert!(interval.high <= max);
    }

    #[test]
    fn prop_fewer_than_two_samples_is_sentinel(sample in prop::collection::vec(0.0f64..5.0, 0..2)) {
        let interval = PriceStatistics::estimate(&sample, 95.0);
        prop_assert_eq!(interval.low, 0.0);
        prop_assert_eq!(interval.mean, 0.0);
        prop_assert_eq!(interval.high, 0.0);
    }

    #[test]
    fn prop_higher_confidence_never_narrows(
        samples in arb_samples(),
        lower in 1.0f64..98.0,
        delta in 0.0f64..1.9,
    ) {
        let narrow = PriceStatistics::estimate(&samples, lower);
        let wide = PriceStatistics::estimate(&samples, lower + delta);
        prop_assert!(wide.width() >= narrow.width());
    }

    #[test]
    fn prop_integer_duration_matches_brute_force(prices in arb_prices(), hours in 1usize..=23) {
        let profile = HourlyPriceProfile::from_means(prices);
        let quote = SlotSearch::default()
            .find_cheapest(&profile, "r", hours as f64)
            .unwrap();
        let expected = brute_force_cheapest(&prices, hours);
        prop_assert!((quote.cost_mean - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    #[test]
    fn prop_chosen_scenario_is_cheaper(
        prices in arb_prices(),
        start in 0usize..24,
        duration in arb_fractional_duration(),
    ) {
        let profile = HourlyPriceProfile::from_means(prices);
        let pair = SlotSearch::default().evaluate_start(&profile, start, duration);
        let chosen = pair.selected().unwrap();
        for other in [pair.fraction_at_start, pair.fraction_at_end].into_iter().flatten() {
            prop_assert!(chosen.cost.mean <= other.cost.mean);
        }
    }

    #[test]
    fn prop_scaling_prices_scales_costs(
        prices in arb_prices(),
        duration in 0.1f64..40.0,
        exponent in -3i32..4,
    ) {
        let k = 2f64.powi(exponent);
        let search = SlotSearch::default();
        let base = search
            .find_cheapest(&HourlyPriceProfile::from_means(prices), "r", duration)
            .unwrap();
        let scaled = search
            .find_cheapest(&HourlyPriceProfile::from_means(prices.map(|p| p * k)), "r", duration)
            .unwrap();

        prop_assert_eq!(scaled.start_hour, base.start_hour);
        prop_assert_eq!(scaled.cost_mean, base.cost_mean * k);
    }

    #[test]
    fn prop_fast_path_agrees_with_slot_search(prices in arb_prices(), duration in 0.05f64..60.0) {
        let quote = SlotSearch::default()
            .find_cheapest(&HourlyPriceProfile::from_means(prices), "r", duration)
            .unwrap();
        let (start, cost) = MeanProfile::new(prices).cheapest_start(duration).unwrap();

        prop_assert_eq!(quote.start_hour, start);
        prop_assert_eq!(quote.cost_mean, cost);
    }

    #[test]
    fn prop_optimizer_never_picks_zero_compute(
        means in prop::collection::vec(prop_oneof![Just(0.0f64), 0.01f64..50.0], 1..20),
        storage_cost in 0.0f64..10.0,
        rate in 0.0f64..0.1,
    ) {
        let mut compute = ComputeCostMap::new();
        for (start, &mean) in means.iter().enumerate() {
            compute.insert_quote(
                "m5.large",
                &CostQuote {
                    cost_low: mean,
                    cost_mean: mean,
                    cost_high: mean,
                    start_hour: start as f64,
                    duration_hours: 2.0,
                    region: "B".to_string(),
                    parallel_factor: 1,
                },
            );
        }
        compute.sort_entries();

        let mut storage = StorageCostMap::default();
        storage.insert(StorageKey::new("A", "m5.large", 1, 2.0), storage_cost);
        let mut transfer = TransferCostMap::new();
        transfer.insert(TransferKey::new("A", "B"), rate);

        let optimizer = ChainOptimizer::new(&OptimizerConfig::default());
        let candidates = optimizer.candidates(&compute, &storage, &transfer, 100.0);
        prop_assert!(candidates.iter().all(|c| c.compute.mean > 0.0));

        let sizes = MapSizes { compute: compute.len(), storage: 1, transfer: 1 };
        if means.iter().any(|&m| m > 0.0) {
            let ranked = optimizer.rank(candidates, sizes, 1).unwrap();
            prop_assert!(ranked[0].breakdown.compute_mean > 0.0);
        } else {
            prop_assert!(optimizer.rank(candidates, sizes, 1).is_err());
        }
    }
}
