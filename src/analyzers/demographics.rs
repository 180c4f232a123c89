//! Block-group demographic summaries and the tract vs block-group
//! comparison.

use serde::Serialize;

use crate::census::BlockGroup;
use crate::geojson::FeatureCollection;
use crate::metrics::{mean, round_to, sample_stddev};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicSummary {
    pub block_groups: usize,
    /// Block groups with a reported median income.
    pub with_income: usize,
    pub min_income: Option<f64>,
    pub max_income: Option<f64>,
    pub mean_income: Option<f64>,
    pub total_population: f64,
    pub mean_pct_no_vehicle: Option<f64>,
}

pub fn summarize_block_groups(rows: &[BlockGroup]) -> DemographicSummary {
    let incomes: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.median_household_income)
        .collect();
    let no_vehicle: Vec<f64> = rows.iter().filter_map(|r| r.pct_no_vehicle).collect();

    DemographicSummary {
        block_groups: rows.len(),
        with_income: incomes.len(),
        min_income: incomes.iter().copied().reduce(f64::min),
        max_income: incomes.iter().copied().reduce(f64::max),
        mean_income: (!incomes.is_empty()).then(|| round_to(mean(&incomes), 0)),
        total_population: rows.iter().filter_map(|r| r.total_population).sum(),
        mean_pct_no_vehicle: (!no_vehicle.is_empty()).then(|| round_to(mean(&no_vehicle), 2)),
    }
}

/// How much finer block groups resolve the study area than tracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GranularityComparison {
    pub tracts: usize,
    pub block_groups: usize,
    /// Block groups per tract, one decimal; 0.0 with no tracts.
    pub ratio: f64,
    pub tract_mean_population: f64,
    pub block_group_mean_population: f64,
    pub tract_income_std: f64,
    pub block_group_income_std: f64,
}

/// Compares two layers carrying `total_population` and
/// `median_household_income` properties. Features missing a value are left
/// out of that statistic.
pub fn compare_granularity(
    tracts: &FeatureCollection,
    block_groups: &FeatureCollection,
) -> GranularityComparison {
    let ratio = match tracts.len() {
        0 => 0.0,
        n => round_to(block_groups.len() as f64 / n as f64, 1),
    };
    let mean_pop = |fc: &FeatureCollection| {
        round_to(mean(&fc.numeric_property("total_population")), 0)
    };
    let income_std = |fc: &FeatureCollection| {
        let incomes = fc.numeric_property("median_household_income");
        round_to(sample_stddev(&incomes), 0)
    };

    GranularityComparison {
        tracts: tracts.len(),
        block_groups: block_groups.len(),
        ratio,
        tract_mean_population: mean_pop(tracts),
        block_group_mean_population: mean_pop(block_groups),
        tract_income_std: income_std(tracts),
        block_group_income_std: income_std(block_groups),
    }
}
