//! BART station ridership loss against catchment demographics.

use serde::{Deserialize, Serialize};

use crate::analyzers::classify::{IncomeCategory, income_category};
use crate::error::Result;
use crate::geojson::{Feature, FeatureCollection, properties_of};
use crate::metrics::{pct_loss, round_to};

/// Input row for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Average weekday exits.
    pub ridership_2019: u32,
    pub ridership_2024: u32,
    pub ac_routes: u32,
    /// AC Transit trips per hour at peak.
    pub peak_frequency: f64,
    pub median_income: f64,
    pub pct_no_vehicle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMetrics {
    #[serde(rename = "Station")]
    pub station: String,
    pub ridership_2019: u32,
    pub ridership_2024: u32,
    pub loss: i64,
    /// Percent of 2019 riders lost, one decimal.
    pub pct_loss: f64,
    /// `100 - pct_loss`, one decimal.
    pub retention: f64,
    pub ac_routes: u32,
    pub peak_frequency: f64,
    pub median_income: f64,
    pub pct_no_vehicle: f64,
    pub income_category: IncomeCategory,
}

pub fn compare_stations(stations: &[Station], low_income_threshold: f64) -> Vec<StationMetrics> {
    stations
        .iter()
        .map(|s| {
            let before = s.ridership_2019 as f64;
            let after = s.ridership_2024 as f64;
            let pct_loss = round_to(pct_loss(before, after), 1);
            StationMetrics {
                station: s.name.clone(),
                ridership_2019: s.ridership_2019,
                ridership_2024: s.ridership_2024,
                loss: s.ridership_2019 as i64 - s.ridership_2024 as i64,
                pct_loss,
                retention: round_to(100.0 - pct_loss, 1),
                ac_routes: s.ac_routes,
                peak_frequency: s.peak_frequency,
                median_income: s.median_income,
                pct_no_vehicle: s.pct_no_vehicle,
                income_category: income_category(s.median_income, low_income_threshold),
            }
        })
        .collect()
}

/// Station points carrying their metrics as properties.
pub fn station_features(
    stations: &[Station],
    metrics: &[StationMetrics],
) -> Result<FeatureCollection> {
    let features = stations
        .iter()
        .zip(metrics)
        .map(|(s, m)| Ok(Feature::point(s.lon, s.lat, properties_of(m)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(FeatureCollection::new(features))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downtown() -> Station {
        Station {
            name: "Downtown Berkeley".to_string(),
            lat: 37.8703,
            lon: -122.2680,
            ridership_2019: 11566,
            ridership_2024: 4170,
            ac_routes: 18,
            peak_frequency: 103.6,
            median_income: 63596.0,
            pct_no_vehicle: 33.2,
        }
    }

    #[test]
    fn test_compare_stations() {
        let m = &compare_stations(&[downtown()], 80_000.0)[0];
        assert_eq!(m.loss, 7396);
        assert_eq!(m.pct_loss, 63.9);
        assert_eq!(m.retention, 36.1);
        assert_eq!(m.income_category, IncomeCategory::LowIncome);
    }

    #[test]
    fn test_zero_baseline_uses_sentinel() {
        let mut s = downtown();
        s.ridership_2019 = 0;
        s.ridership_2024 = 0;
        let m = &compare_stations(&[s], 80_000.0)[0];
        assert_eq!(m.pct_loss, 0.0);
        assert_eq!(m.retention, 100.0);
    }

    #[test]
    fn test_station_features() {
        let stations = vec![downtown()];
        let metrics = compare_stations(&stations, 80_000.0);
        let fc = station_features(&stations, &metrics).unwrap();

        assert_eq!(fc.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(feature.property_str("Station"), Some("Downtown Berkeley"));
        assert_eq!(
            feature.property_str("income_category"),
            Some("Low-Income Area")
        );
    }
}
