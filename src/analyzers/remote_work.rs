//! Work-from-home retention and the changed-travel-pattern breakdown.

use serde::{Deserialize, Serialize};

use crate::metrics::{pct, round_to};

/// Bay Area remote workers in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WfhYear {
    pub year: u16,
    pub workers: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WfhFlow {
    pub year: u16,
    pub workers: u64,
    pub percent: f64,
    pub new_wfh_vs_baseline: i64,
    pub returned_vs_peak: i64,
}

/// Where the peak remote-work cohort ended up by the latest year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WfhRetention {
    pub baseline_year: u16,
    pub baseline_workers: u64,
    pub peak_year: u16,
    pub peak_workers: u64,
    pub latest_year: u16,
    pub latest_workers: u64,
    pub new_at_peak: i64,
    pub stayed_home: i64,
    pub returned_to_office: i64,
    pub pct_stayed_home: f64,
    pub pct_returned: f64,
}

/// Per-year deltas against the earliest year and the peak year.
pub fn wfh_flow(series: &[WfhYear]) -> Vec<WfhFlow> {
    let Some(retention) = wfh_retention(series) else {
        return Vec::new();
    };
    let mut rows: Vec<WfhFlow> = series
        .iter()
        .map(|y| WfhFlow {
            year: y.year,
            workers: y.workers,
            percent: y.percent,
            new_wfh_vs_baseline: y.workers as i64 - retention.baseline_workers as i64,
            returned_vs_peak: retention.peak_workers as i64 - y.workers as i64,
        })
        .collect();
    rows.sort_by_key(|r| r.year);
    rows
}

/// `None` for an empty series.
pub fn wfh_retention(series: &[WfhYear]) -> Option<WfhRetention> {
    let baseline = series.iter().min_by_key(|y| y.year)?;
    let latest = series.iter().max_by_key(|y| y.year)?;
    // earliest year wins a tie for the peak
    let peak = series
        .iter()
        .max_by(|a, b| a.workers.cmp(&b.workers).then(b.year.cmp(&a.year)))?;

    let new_at_peak = peak.workers as i64 - baseline.workers as i64;
    let stayed_home = latest.workers as i64 - baseline.workers as i64;
    let returned_to_office = peak.workers as i64 - latest.workers as i64;

    Some(WfhRetention {
        baseline_year: baseline.year,
        baseline_workers: baseline.workers,
        peak_year: peak.year,
        peak_workers: peak.workers,
        latest_year: latest.year,
        latest_workers: latest.workers,
        new_at_peak,
        stayed_home,
        returned_to_office,
        pct_stayed_home: round_to(pct(stayed_home as f64, new_at_peak as f64), 1),
        pct_returned: round_to(pct(returned_to_office as f64, new_at_peak as f64), 1),
    })
}

/// Estimated riders lost to one kind of changed travel pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternShare {
    pub category: String,
    pub riders: u64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternShareRow {
    pub category: String,
    pub riders: u64,
    pub pct_of_total: f64,
    pub description: String,
}

/// Each category's share of the summed riders.
pub fn pattern_shares(patterns: &[PatternShare]) -> Vec<PatternShareRow> {
    let total: u64 = patterns.iter().map(|p| p.riders).sum();
    patterns
        .iter()
        .map(|p| PatternShareRow {
            category: p.category.clone(),
            riders: p.riders,
            pct_of_total: round_to(pct(p.riders as f64, total as f64), 1),
            description: p.description.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<WfhYear> {
        let rows = [
            (2019, 260_000, 7.0),
            (2020, 800_000, 22.0),
            (2021, 1_200_000, 33.0),
            (2022, 938_000, 25.0),
            (2023, 750_000, 19.0),
        ];
        rows.into_iter()
            .map(|(year, workers, percent)| WfhYear {
                year,
                workers,
                percent,
            })
            .collect()
    }

    #[test]
    fn test_wfh_retention() {
        let r = wfh_retention(&series()).unwrap();
        assert_eq!(r.peak_year, 2021);
        assert_eq!(r.new_at_peak, 940_000);
        assert_eq!(r.stayed_home, 490_000);
        assert_eq!(r.returned_to_office, 450_000);
        assert_eq!(r.pct_stayed_home, 52.1);
        assert_eq!(r.pct_returned, 47.9);
    }

    #[test]
    fn test_wfh_flow_deltas() {
        let rows = wfh_flow(&series());
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].new_wfh_vs_baseline, 0);
        assert_eq!(rows[2].returned_vs_peak, 0);
        assert_eq!(rows[4].new_wfh_vs_baseline, 490_000);
        assert_eq!(rows[4].returned_vs_peak, 450_000);
    }

    #[test]
    fn test_empty_series() {
        assert!(wfh_retention(&[]).is_none());
        assert!(wfh_flow(&[]).is_empty());
    }

    #[test]
    fn test_pattern_shares() {
        let patterns: Vec<PatternShare> = [8000, 4000, 3000, 3000, 2000]
            .into_iter()
            .enumerate()
            .map(|(i, riders)| PatternShare {
                category: format!("c{i}"),
                riders,
                description: String::new(),
            })
            .collect();
        let rows = pattern_shares(&patterns);
        let pcts: Vec<f64> = rows.iter().map(|r| r.pct_of_total).collect();
        assert_eq!(pcts, vec![40.0, 20.0, 15.0, 15.0, 10.0]);
    }
}
