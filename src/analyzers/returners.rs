//! Where former transit riders among office returners went.

use serde::{Deserialize, Serialize};

use crate::metrics::{pct, round_to};

/// Commute mode shares (percent of workers) in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeShareYear {
    pub year: u16,
    pub transit: f64,
    pub drive: f64,
    pub wfh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnerCategory {
    pub category: String,
    pub riders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnerCategoryRow {
    pub category: String,
    pub riders: u64,
    pub pct_of_former_riders: f64,
}

/// Percentage-point change in each mode between two years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeShift {
    pub from_year: u16,
    pub to_year: u16,
    pub transit_delta: f64,
    pub drive_delta: f64,
    pub wfh_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnerAnalysis {
    pub returners_total: u64,
    pub transit_share: f64,
    /// `returners_total * transit_share`, truncated.
    pub former_transit_riders: u64,
    /// WFH share drop from its peak to the latest year, applied to the
    /// regional workforce.
    pub implied_returners: Option<u64>,
    pub breakdown: Vec<ReturnerCategoryRow>,
    pub mode_shift: Option<ModeShift>,
}

pub fn mode_shift(series: &[ModeShareYear]) -> Option<ModeShift> {
    let first = series.iter().min_by_key(|y| y.year)?;
    let last = series.iter().max_by_key(|y| y.year)?;
    Some(ModeShift {
        from_year: first.year,
        to_year: last.year,
        transit_delta: round_to(last.transit - first.transit, 1),
        drive_delta: round_to(last.drive - first.drive, 1),
        wfh_delta: round_to(last.wfh - first.wfh, 1),
    })
}

fn implied_returners(series: &[ModeShareYear], workforce: u64) -> Option<u64> {
    let latest = series.iter().max_by_key(|y| y.year)?;
    let peak = series
        .iter()
        .max_by(|a, b| a.wfh.total_cmp(&b.wfh))?;
    let drop = (peak.wfh - latest.wfh).max(0.0);
    Some((drop / 100.0 * workforce as f64).round() as u64)
}

pub fn analyze_returners(
    returners_total: u64,
    transit_share: f64,
    workforce: u64,
    breakdown: &[ReturnerCategory],
    mode_share: &[ModeShareYear],
) -> ReturnerAnalysis {
    let breakdown_total: u64 = breakdown.iter().map(|c| c.riders).sum();
    ReturnerAnalysis {
        returners_total,
        transit_share,
        former_transit_riders: (returners_total as f64 * transit_share).trunc() as u64,
        implied_returners: implied_returners(mode_share, workforce),
        breakdown: breakdown
            .iter()
            .map(|c| ReturnerCategoryRow {
                category: c.category.clone(),
                riders: c.riders,
                pct_of_former_riders: round_to(pct(c.riders as f64, breakdown_total as f64), 0),
            })
            .collect(),
        mode_shift: mode_shift(mode_share),
    }
}
