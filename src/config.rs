//! Study configuration.
//!
//! Everything the report treats as a fixed input lives here: the study-area
//! allow-list, endpoint settings, and the analytic constants and published
//! series the analyses start from. Stored as a JSON object on disk; every
//! field is optional and falls back to the values used in the report:
//! ```json
//! {
//!   "transit_share": 0.13,
//!   "study_area": { "level": "tract", "codes": ["06001422200"] }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyzers::remote_work::{PatternShare, WfhYear};
use crate::analyzers::returners::{ModeShareYear, ReturnerCategory};
use crate::analyzers::service::{AcTransitYear, BartYear};
use crate::analyzers::stations::Station;
use crate::census::CensusQuery;
use crate::error::Result;
use crate::geography::{AllowList, GeoLevel};
use crate::gtfs::BoundingBox;
use crate::lodes::LodesQuery;

/// The 19 Berkeley census tracts.
pub const BERKELEY_TRACTS: [&str; 19] = [
    "06001400500",
    "06001400700",
    "06001421800",
    "06001421900",
    "06001422200",
    "06001422300",
    "06001422400",
    "06001422500",
    "06001422800",
    "06001422901",
    "06001423000",
    "06001423100",
    "06001423400",
    "06001423500",
    "06001423601",
    "06001423602",
    "06001423901",
    "06001423902",
    "06001424001",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyArea {
    pub level: GeoLevel,
    pub codes: Vec<String>,
}

impl Default for StudyArea {
    fn default() -> Self {
        Self {
            level: GeoLevel::Tract,
            codes: BERKELEY_TRACTS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl StudyArea {
    pub fn allow_list(&self) -> Result<AllowList> {
        AllowList::new(self.level, &self.codes)
    }
}

/// LODES file selection plus the two years compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodesSettings {
    #[serde(flatten)]
    pub query: LodesQuery,
    pub pre_year: u16,
    pub post_year: u16,
}

impl Default for LodesSettings {
    fn default() -> Self {
        Self {
            query: LodesQuery::default(),
            pre_year: 2019,
            post_year: 2021,
        }
    }
}

/// Route-network query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub bbox: BoundingBox,
    pub max_routes: usize,
    pub catchment_radius_miles: f64,
    /// Peak window as `[start, end)` hours.
    pub peak_start_hour: u32,
    pub peak_end_hour: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bbox: BoundingBox {
                min_lat: 37.85,
                max_lat: 37.88,
                min_lon: -122.30,
                max_lon: -122.25,
            },
            max_routes: 30,
            catchment_radius_miles: 0.5,
            peak_start_hour: 7,
            peak_end_hour: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub study_area: StudyArea,
    pub census: CensusQuery,
    pub lodes: LodesSettings,
    pub network: NetworkSettings,

    /// Share of commuters using transit before the pandemic.
    pub transit_share: f64,
    /// BART on-time performance goal, percent.
    pub otp_goal: f64,
    /// Median household income below which an area is low-income.
    pub low_income_threshold: f64,
    /// Bay Area workforce used to scale mode-share changes.
    pub workforce: u64,
    /// Workers who returned to the office since the remote-work peak.
    pub returners_total: u64,
    pub top_origin_counties: usize,

    pub stations: Vec<Station>,
    pub wfh_series: Vec<WfhYear>,
    pub changed_patterns: Vec<PatternShare>,
    pub returner_breakdown: Vec<ReturnerCategory>,
    pub mode_share: Vec<ModeShareYear>,
    pub bart_series: Vec<BartYear>,
    pub ac_transit_series: Vec<AcTransitYear>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            study_area: StudyArea::default(),
            census: CensusQuery::default(),
            lodes: LodesSettings::default(),
            network: NetworkSettings::default(),
            transit_share: 0.13,
            otp_goal: 91.0,
            low_income_threshold: 80_000.0,
            workforce: 3_200_000,
            returners_total: 450_000,
            top_origin_counties: 10,
            stations: default_stations(),
            wfh_series: default_wfh_series(),
            changed_patterns: default_changed_patterns(),
            returner_breakdown: default_returner_breakdown(),
            mode_share: default_mode_share(),
            bart_series: default_bart_series(),
            ac_transit_series: default_ac_transit_series(),
        }
    }
}

impl StudyConfig {
    /// Loads the config from a JSON file at `path`.
    ///
    /// A missing file yields [`StudyConfig::default`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No study config found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Study config loaded");
        Ok(config)
    }
}

#[allow(clippy::too_many_arguments)]
fn station(
    name: &str,
    lat: f64,
    lon: f64,
    ridership_2019: u32,
    ridership_2024: u32,
    ac_routes: u32,
    peak_frequency: f64,
    median_income: f64,
    pct_no_vehicle: f64,
) -> Station {
    Station {
        name: name.to_string(),
        lat,
        lon,
        ridership_2019,
        ridership_2024,
        ac_routes,
        peak_frequency,
        median_income,
        pct_no_vehicle,
    }
}

fn default_stations() -> Vec<Station> {
    vec![
        station(
            "Downtown Berkeley",
            37.8703,
            -122.2680,
            11_566,
            4_170,
            18,
            103.6,
            63_596.0,
            33.2,
        ),
        station(
            "North Berkeley",
            37.8740,
            -122.2834,
            5_894,
            2_248,
            9,
            47.0,
            95_556.0,
            15.6,
        ),
        station(
            "Ashby",
            37.8530,
            -122.2697,
            7_522,
            2_264,
            9,
            44.5,
            103_532.0,
            14.9,
        ),
    ]
}

fn default_wfh_series() -> Vec<WfhYear> {
    [
        (2019, 260_000, 7.0),
        (2020, 800_000, 22.0),
        (2021, 1_200_000, 33.0),
        (2022, 938_000, 25.0),
        (2023, 750_000, 19.0),
    ]
    .into_iter()
    .map(|(year, workers, percent)| WfhYear {
        year,
        workers,
        percent,
    })
    .collect()
}

fn default_changed_patterns() -> Vec<PatternShare> {
    [
        (
            "Hybrid Work Schedules",
            8_000,
            "Commute 2-3 days per week instead of 5",
        ),
        ("Job Changes", 4_000, "Moved to jobs not served by BART"),
        ("Unemployment/Retirement", 3_000, "Left the workforce"),
        (
            "Shift to Off-Peak Hours",
            3_000,
            "Travel outside the traditional commute peak",
        ),
        ("Reduced Trip Frequency", 2_000, "Fewer discretionary trips"),
    ]
    .into_iter()
    .map(|(category, riders, description)| PatternShare {
        category: category.to_string(),
        riders,
        description: description.to_string(),
    })
    .collect()
}

fn default_returner_breakdown() -> Vec<ReturnerCategory> {
    [
        ("Hybrid", 20_000),
        ("Switched to Driving", 30_000),
        ("Returned to Transit", 6_000),
        ("Other", 3_000),
    ]
    .into_iter()
    .map(|(category, riders)| ReturnerCategory {
        category: category.to_string(),
        riders,
    })
    .collect()
}

fn default_mode_share() -> Vec<ModeShareYear> {
    [
        (2019, 13.0, 73.0, 7.0),
        (2021, 4.0, 59.0, 33.0),
        (2023, 7.0, 68.0, 19.0),
    ]
    .into_iter()
    .map(|(year, transit, drive, wfh)| ModeShareYear {
        year,
        transit,
        drive,
        wfh,
    })
    .collect()
}

fn default_bart_series() -> Vec<BartYear> {
    [
        (2018, 91.4, 105.1),
        (2019, 90.1, 100.0),
        (2020, 88.5, 80.2),
        (2021, 85.0, 12.4),
        (2022, 76.0, 21.0),
        (2023, 71.0, 36.0),
        (2024, 92.0, 35.0),
    ]
    .into_iter()
    .map(|(year, otp, ridership_pct)| BartYear {
        year,
        otp,
        ridership_pct,
    })
    .collect()
}

fn default_ac_transit_series() -> Vec<AcTransitYear> {
    [
        (2019, 100.0, 100.0),
        (2020, 28.0, 85.0),
        (2021, 28.0, 70.0),
        (2022, 60.7, 85.0),
        (2023, 64.1, 95.0),
        (2024, 75.2, 100.0),
    ]
    .into_iter()
    .map(|(year, ridership_pct, service_pct)| AcTransitYear {
        year,
        ridership_pct,
        service_pct,
    })
    .collect()
}
