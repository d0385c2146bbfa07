//! Cheapest start-slot search over a cyclic 24-hour price profile
//!
//! The profile is concatenated with itself into a 48-hour table with prefix
//! sums, so the cost of any window is two lookups. A fractional duration is
//! evaluated twice per start hour: with the partial hour at the beginning of
//! the window and with it at the end. Whole days are charged at the daily
//! sum, which keeps every window inside the 48-hour table.

use crate::profile::HourlyPriceProfile;
use crate::types::{ConfidenceInterval, CostQuote, HOURS_PER_DAY};
use serde::{Deserialize, Serialize};

const EXTENDED_HOURS: usize = 2 * HOURS_PER_DAY;

/// Slot search behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSearchConfig {
    /// Drop windows that cover an hour without price data
    pub skip_windows_with_gaps: bool,
}

impl Default for SlotSearchConfig {
    fn default() -> Self {
        Self {
            skip_windows_with_gaps: true,
        }
    }
}

/// Where the partial hour of a fractional duration is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Partial hour first, reported start moves back by the fraction
    FractionAtStart,
    /// Partial hour last, reported start is the whole start hour
    FractionAtEnd,
}

/// Cost of one scenario for one start hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotCost {
    /// Cost of one instance over the window
    pub cost: ConfidenceInterval,
    /// Reported start hour
    pub start_hour: f64,
    /// Scenario that produced this cost
    pub scenario: Scenario,
}

/// Both scenarios for one start hour; `None` when a scenario does not apply
/// or its window covers missing data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioPair {
    /// Partial hour at the beginning
    pub fraction_at_start: Option<SlotCost>,
    /// Partial hour at the end
    pub fraction_at_end: Option<SlotCost>,
}

impl ScenarioPair {
    /// Lower mean cost wins; exact ties go to the fraction-at-end scenario
    pub fn selected(&self) -> Option<SlotCost> {
        match (self.fraction_at_start, self.fraction_at_end) {
            (Some(start), Some(end)) => {
                if start.cost.mean < end.cost.mean {
                    Some(start)
                } else {
                    Some(end)
                }
            }
            (Some(start), None) => Some(start),
            (None, end) => end,
        }
    }
}

/// Duration split into whole days, remaining whole hours and a fraction
#[derive(Debug, Clone, Copy)]
struct DurationSplit {
    days: usize,
    hours: usize,
    fraction: f64,
}

impl DurationSplit {
    fn new(duration_hours: f64) -> Self {
        let whole = duration_hours.floor();
        let fraction = duration_hours - whole;
        let whole = whole as usize;
        Self {
            days: whole / HOURS_PER_DAY,
            hours: whole % HOURS_PER_DAY,
            fraction,
        }
    }
}

/// 48-hour extended profile with prefix sums over each component
struct PrefixTable {
    extended: [ConfidenceInterval; EXTENDED_HOURS],
    low: [f64; EXTENDED_HOURS + 1],
    mean: [f64; EXTENDED_HOURS + 1],
    high: [f64; EXTENDED_HOURS + 1],
    gaps: [usize; EXTENDED_HOURS + 1],
}

impl PrefixTable {
    fn new(profile: &HourlyPriceProfile) -> Self {
        let extended: [ConfidenceInterval; EXTENDED_HOURS] =
            std::array::from_fn(|i| *profile.hour(i));
        let mut low = [0.0; EXTENDED_HOURS + 1];
        let mut mean = [0.0; EXTENDED_HOURS + 1];
        let mut high = [0.0; EXTENDED_HOURS + 1];
        let mut gaps = [0usize; EXTENDED_HOURS + 1];

        for (i, hour) in extended.iter().enumerate() {
            low[i + 1] = low[i] + hour.low;
            mean[i + 1] = mean[i] + hour.mean;
            high[i + 1] = high[i] + hour.high;
            gaps[i + 1] = gaps[i] + usize::from(hour.is_sentinel());
        }

        Self {
            extended,
            low,
            mean,
            high,
            gaps,
        }
    }

    /// Sum over extended hours `[from, to)`
    fn sum(&self, from: usize, to: usize) -> ConfidenceInterval {
        ConfidenceInterval::new(
            self.low[to] - self.low[from],
            self.mean[to] - self.mean[from],
            self.high[to] - self.high[from],
        )
    }

    fn gaps_between(&self, from: usize, to: usize) -> usize {
        self.gaps[to] - self.gaps[from]
    }

    fn daily(&self) -> ConfidenceInterval {
        self.sum(0, HOURS_PER_DAY)
    }

    fn has_gaps(&self) -> bool {
        self.gaps[HOURS_PER_DAY] > 0
    }
}

/// Scenario-based slot search
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotSearch {
    config: SlotSearchConfig,
}

impl SlotSearch {
    /// Create a slot search
    pub fn new(config: SlotSearchConfig) -> Self {
        Self { config }
    }

    /// Both scenarios for one start hour, cost of a single instance
    pub fn evaluate_start(
        &self,
        profile: &HourlyPriceProfile,
        start: usize,
        duration_hours: f64,
    ) -> ScenarioPair {
        let table = PrefixTable::new(profile);
        self.evaluate(&table, start % HOURS_PER_DAY, &DurationSplit::new(duration_hours))
    }

    fn evaluate(&self, table: &PrefixTable, start: usize, split: &DurationSplit) -> ScenarioPair {
        let whole_days = table.daily().scale(split.days as f64);
        let days_usable = split.days == 0 || !table.has_gaps();
        let usable = |touches_gap: bool| !self.config.skip_windows_with_gaps || !touches_gap;

        let end = start + split.hours;
        let mut at_end = table.sum(start, end);
        at_end += table.extended[end].scale(split.fraction);
        at_end += whole_days;
        let end_gap = table.gaps_between(start, end) > 0
            || (split.fraction > 0.0 && table.extended[end].is_sentinel())
            || !days_usable;
        let fraction_at_end = usable(end_gap).then_some(SlotCost {
            cost: at_end,
            start_hour: start as f64,
            scenario: Scenario::FractionAtEnd,
        });

        let fraction_at_start = if split.fraction > 0.0 {
            let first_full = start + 1;
            let mut at_start = table.extended[start].scale(split.fraction);
            at_start += table.sum(first_full, first_full + split.hours);
            at_start += whole_days;
            let start_gap = table.extended[start].is_sentinel()
                || table.gaps_between(first_full, first_full + split.hours) > 0
                || !days_usable;
            let start_hour = if start == 0 {
                HOURS_PER_DAY as f64 - split.fraction
            } else {
                start as f64 - split.fraction
            };
            usable(start_gap).then_some(SlotCost {
                cost: at_start,
                start_hour,
                scenario: Scenario::FractionAtStart,
            })
        } else {
            None
        };

        ScenarioPair {
            fraction_at_start,
            fraction_at_end,
        }
    }

    /// Every usable (start hour, factor) slot.
    ///
    /// Each of `factor` instances runs `duration_hours / factor`; the quoted
    /// cost covers all of them. Slots with a non-positive mean are dropped.
    pub fn find_all_slots(
        &self,
        profile: &HourlyPriceProfile,
        region: &str,
        duration_hours: f64,
        parallel_factors: &[u32],
    ) -> Vec<CostQuote> {
        if profile.is_priceless() || !(duration_hours.is_finite() && duration_hours > 0.0) {
            return Vec::new();
        }

        let table = PrefixTable::new(profile);
        let mut quotes = Vec::with_capacity(parallel_factors.len() * HOURS_PER_DAY);

        for &factor in parallel_factors.iter().filter(|&&f| f > 0) {
            let per_instance = duration_hours / factor as f64;
            let split = DurationSplit::new(per_instance);

            for start in 0..HOURS_PER_DAY {
                let Some(slot) = self.evaluate(&table, start, &split).selected() else {
                    continue;
                };
                let cost = slot.cost.scale(factor as f64);
                if cost.mean > 0.0 {
                    quotes.push(CostQuote {
                        cost_low: cost.low,
                        cost_mean: cost.mean,
                        cost_high: cost.high,
                        start_hour: slot.start_hour,
                        duration_hours: per_instance,
                        region: region.to_string(),
                        parallel_factor: factor,
                    });
                }
            }
        }

        quotes
    }

    /// Cheapest single-instance slot; the earliest start wins ties
    pub fn find_cheapest(
        &self,
        profile: &HourlyPriceProfile,
        region: &str,
        duration_hours: f64,
    ) -> Option<CostQuote> {
        let mut best: Option<CostQuote> = None;
        for quote in self.find_all_slots(profile, region, duration_hours, &[1]) {
            if best.as_ref().map_or(true, |b| quote.cost_mean < b.cost_mean) {
                best = Some(quote);
            }
        }
        best
    }
}

/// Mean-only fast path on a fixed 24-entry array.
///
/// Evaluates the same two scenarios as [`SlotSearch`] without interval
/// bounds and without heap allocation. Only usable when every hour is
/// priced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanProfile {
    prices: [f64; HOURS_PER_DAY],
}

impl MeanProfile {
    /// Wrap hourly mean prices
    pub fn new(prices: [f64; HOURS_PER_DAY]) -> Self {
        Self { prices }
    }

    /// Mean component of a full profile
    pub fn from_profile(profile: &HourlyPriceProfile) -> Self {
        Self::new(profile.means())
    }

    /// Every hour has a finite positive price
    pub fn is_complete(&self) -> bool {
        self.prices.iter().all(|p| p.is_finite() && *p > 0.0)
    }

    /// `(reported start hour, cost)` of the cheapest single-instance slot
    pub fn cheapest_start(&self, duration_hours: f64) -> Option<(f64, f64)> {
        if !self.is_complete() || !(duration_hours.is_finite() && duration_hours > 0.0) {
            return None;
        }

        let extended: [f64; EXTENDED_HOURS] =
            std::array::from_fn(|i| self.prices[i % HOURS_PER_DAY]);
        let mut prefix = [0.0; EXTENDED_HOURS + 1];
        for (i, price) in extended.iter().enumerate() {
            prefix[i + 1] = prefix[i] + price;
        }

        let split = DurationSplit::new(duration_hours);
        let whole_days = prefix[HOURS_PER_DAY] * split.days as f64;
        let mut best: Option<(f64, f64)> = None;

        for start in 0..HOURS_PER_DAY {
            let end = start + split.hours;
            let mut at_end = prefix[end] - prefix[start];
            at_end += extended[end] * split.fraction;
            at_end += whole_days;
            let mut candidate = (start as f64, at_end);

            if split.fraction > 0.0 {
                let first_full = start + 1;
                let mut at_start = extended[start] * split.fraction;
                at_start += prefix[first_full + split.hours] - prefix[first_full];
                at_start += whole_days;
                if at_start < at_end {
                    let reported = if start == 0 {
                        HOURS_PER_DAY as f64 - split.fraction
                    } else {
                        start as f64 - split.fraction
                    };
                    candidate = (reported, at_start);
                }
            }

            if best.map_or(true, |(_, cost)| candidate.1 < cost) {
                best = Some(candidate);
            }
        }

        best
    }

    /// Cheapest slot when the job is split over `factor` instances; the
    /// returned cost covers all instances
    pub fn cheapest_start_parallel(&self, duration_hours: f64, factor: u32) -> Option<(f64, f64)> {
        if factor == 0 {
            return None;
        }
        self.cheapest_start(duration_hours / factor as f64)
            .map(|(start, cost)| (start, cost * factor as f64))
    }
}
