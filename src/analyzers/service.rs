//! Service-quality series: on-time performance, excess wait time, and the
//! combined BART / AC Transit degradation table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::{delta, mean_by, round_to};

/// A row of the historical performance CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OtpRecord {
    #[serde(rename = "Fiscal_Year")]
    pub fiscal_year: f64,
    #[serde(rename = "On_Time_Performance_%")]
    pub on_time_performance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpPoint {
    pub year: i32,
    pub on_time_performance: f64,
    pub delta_from_goal: f64,
    pub year_over_year: Option<f64>,
}

/// OTP series ordered by year, with deltas against `goal` and the prior year.
pub fn otp_series(records: &[OtpRecord], goal: f64) -> Vec<OtpPoint> {
    let mut sorted: Vec<(i32, f64)> = records
        .iter()
        .map(|r| (r.fiscal_year as i32, r.on_time_performance))
        .collect();
    sorted.sort_by_key(|(year, _)| *year);

    let mut prev: Option<f64> = None;
    sorted
        .into_iter()
        .map(|(year, otp)| {
            let point = OtpPoint {
                year,
                on_time_performance: otp,
                delta_from_goal: round_to(delta(goal, otp), 1),
                year_over_year: prev.map(|p| round_to(delta(p, otp), 1)),
            };
            prev = Some(otp);
            point
        })
        .collect()
}

/// Lowest point of the OTP series and the recovery since.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpLow {
    pub low_year: i32,
    pub low: f64,
    pub below_goal: f64,
    pub latest_year: i32,
    pub latest: f64,
    pub recovery: f64,
}

pub fn otp_low(series: &[OtpPoint], goal: f64) -> Option<OtpLow> {
    let low = series
        .iter()
        .min_by(|a, b| a.on_time_performance.total_cmp(&b.on_time_performance))?;
    let latest = series.last()?;
    Some(OtpLow {
        low_year: low.year,
        low: low.on_time_performance,
        below_goal: round_to(goal - low.on_time_performance, 1),
        latest_year: latest.year,
        latest: latest.on_time_performance,
        recovery: round_to(latest.on_time_performance - low.on_time_performance, 1),
    })
}

/// A row of the temporal equity CSV.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EwtRecord {
    #[serde(rename = "Fiscal_Year")]
    pub fiscal_year: f64,
    #[serde(rename = "Income_Category")]
    pub income_category: String,
    #[serde(rename = "Estimated_EWT_Min")]
    pub estimated_ewt_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EwtMean {
    pub year: i32,
    pub income_category: String,
    pub mean_ewt_min: f64,
}

/// Mean excess wait time per (year, income category).
pub fn ewt_by_income(records: &[EwtRecord]) -> Vec<EwtMean> {
    mean_by(
        records,
        |r| (r.fiscal_year as i32, r.income_category.clone()),
        |r| r.estimated_ewt_min,
    )
    .into_iter()
    .map(|((year, income_category), mean)| EwtMean {
        year,
        income_category,
        mean_ewt_min: round_to(mean, 2),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BartYear {
    pub year: u16,
    pub otp: f64,
    /// Ridership as a percent of 2019.
    pub ridership_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcTransitYear {
    pub year: u16,
    pub ridership_pct: f64,
    /// Scheduled service as a percent of 2019.
    pub service_pct: f64,
}

/// One year of the combined degradation table. A system missing for a
/// year leaves its cells empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DualSystemRow {
    pub year: u16,
    pub bart_otp: Option<f64>,
    pub bart_ridership_pct: Option<f64>,
    pub bart_ridership_lost_pct: Option<f64>,
    pub ac_ridership_pct: Option<f64>,
    pub ac_ridership_lost_pct: Option<f64>,
    pub ac_service_pct: Option<f64>,
    pub ac_service_cut_pct: Option<f64>,
}

pub fn dual_system(bart: &[BartYear], ac: &[AcTransitYear]) -> Vec<DualSystemRow> {
    let mut rows: BTreeMap<u16, DualSystemRow> = BTreeMap::new();

    for b in bart {
        let row = rows.entry(b.year).or_insert_with(|| DualSystemRow {
            year: b.year,
            ..Default::default()
        });
        row.bart_otp = Some(b.otp);
        row.bart_ridership_pct = Some(b.ridership_pct);
        row.bart_ridership_lost_pct = Some(round_to(100.0 - b.ridership_pct, 1));
    }
    for a in ac {
        let row = rows.entry(a.year).or_insert_with(|| DualSystemRow {
            year: a.year,
            ..Default::default()
        });
        row.ac_ridership_pct = Some(a.ridership_pct);
        row.ac_ridership_lost_pct = Some(round_to(100.0 - a.ridership_pct, 1));
        row.ac_service_pct = Some(a.service_pct);
        row.ac_service_cut_pct = Some(round_to(100.0 - a.service_pct, 1));
    }

    rows.into_values().collect()
}
