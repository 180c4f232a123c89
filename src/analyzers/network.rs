//! Bus connectivity around BART stations and the route-network layer.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::analyzers::stations::Station;
use crate::geojson::{Feature, FeatureCollection};
use crate::gtfs::{Feed, RouteShape, parse_gtfs_time};
use crate::metrics::round_to;

const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Great-circle distance in miles.
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}

/// Peak-period window in whole hours, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl PeakWindow {
    fn contains(&self, seconds: u32) -> bool {
        let start = self.start_hour.saturating_mul(3600);
        let end = self.end_hour.saturating_mul(3600);
        (start..end).contains(&seconds)
    }

    fn hours(&self) -> u32 {
        self.end_hour.saturating_sub(self.start_hour)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connectivity {
    #[serde(rename = "Station")]
    pub station: String,
    pub stops_in_catchment: usize,
    pub routes: usize,
    /// Distinct trips departing a catchment stop during the peak window,
    /// per hour. One decimal.
    pub peak_trips_per_hour: f64,
}

/// Bus service within `radius_miles` of a station.
pub fn station_connectivity(
    feed: &Feed,
    station: &Station,
    radius_miles: f64,
    peak: PeakWindow,
) -> Connectivity {
    let stops: HashSet<&str> = feed
        .stops
        .iter()
        .filter(|s| match (s.stop_lat, s.stop_lon) {
            (Some(lat), Some(lon)) => {
                haversine_miles(station.lat, station.lon, lat, lon) <= radius_miles
            }
            _ => false,
        })
        .map(|s| s.stop_id.as_str())
        .collect();

    let mut trips: HashSet<&str> = HashSet::new();
    let mut peak_trips: HashSet<&str> = HashSet::new();
    for st in &feed.stop_times {
        if !st.stop_id.as_deref().is_some_and(|id| stops.contains(id)) {
            continue;
        }
        trips.insert(&st.trip_id);
        let departs = st.departure_time.as_deref().and_then(parse_gtfs_time);
        if departs.is_some_and(|t| peak.contains(t)) {
            peak_trips.insert(&st.trip_id);
        }
    }

    let routes: HashSet<&str> = feed
        .trips
        .iter()
        .filter(|t| trips.contains(t.trip_id.as_str()))
        .map(|t| t.route_id.as_str())
        .collect();

    let peak_trips_per_hour = match peak.hours() {
        0 => 0.0,
        hours => round_to(peak_trips.len() as f64 / hours as f64, 1),
    };

    Connectivity {
        station: station.name.clone(),
        stops_in_catchment: stops.len(),
        routes: routes.len(),
        peak_trips_per_hour,
    }
}

/// Route shapes as line features carrying the route's identifiers.
pub fn route_features(shapes: &[RouteShape]) -> FeatureCollection {
    let features = shapes
        .iter()
        .map(|shape| {
            let fields = [
                ("route_id", &shape.route_id),
                ("route_short_name", &shape.short_name),
                ("route_long_name", &shape.long_name),
                ("shape_id", &shape.shape_id),
            ];
            let props: Map<String, Value> = fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::from(value.as_str())))
                .collect();
            Feature::line(&shape.points, props)
        })
        .collect();
    FeatureCollection::new(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::{Stop, StopTime, Trip};

    fn station() -> Station {
        Station {
            name: "Downtown Berkeley".to_string(),
            lat: 37.8703,
            lon: -122.2680,
            ridership_2019: 11_566,
            ridership_2024: 4_170,
            ac_routes: 18,
            peak_frequency: 103.6,
            median_income: 63_596.0,
            pct_no_vehicle: 33.2,
        }
    }

    fn stop(id: &str, lat: f64, lon: f64) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_name: None,
            stop_lat: Some(lat),
            stop_lon: Some(lon),
        }
    }

    fn trip(route: &str, id: &str) -> Trip {
        Trip {
            route_id: route.to_string(),
            trip_id: id.to_string(),
            shape_id: None,
        }
    }

    fn stop_time(trip: &str, stop: &str, departs: &str) -> StopTime {
        StopTime {
            trip_id: trip.to_string(),
            stop_id: Some(stop.to_string()),
            departure_time: Some(departs.to_string()),
        }
    }

    const PEAK: PeakWindow = PeakWindow {
        start_hour: 7,
        end_hour: 9,
    };

    #[test]
    fn test_haversine() {
        assert_eq!(haversine_miles(37.87, -122.27, 37.87, -122.27), 0.0);
        // Downtown Berkeley to Ashby is about 1.2 miles
        let d = haversine_miles(37.8703, -122.2680, 37.8530, -122.2697);
        assert!((d - 1.2).abs() < 0.05, "{d}");
    }

    #[test]
    fn test_station_connectivity() {
        let feed = Feed {
            stops: vec![
                stop("near", 37.8705, -122.2685),
                stop("also_near", 37.8690, -122.2670),
                stop("far", 37.8000, -122.2700),
            ],
            trips: vec![
                trip("6", "a"),
                trip("51B", "b"),
                trip("51B", "c"),
                trip("F", "d"),
            ],
            stop_times: vec![
                stop_time("a", "near", "07:10:00"),
                stop_time("b", "near", "08:59:59"),
                stop_time("b", "also_near", "09:01:00"),
                stop_time("c", "also_near", "12:00:00"),
                stop_time("d", "far", "07:30:00"),
            ],
            ..Default::default()
        };

        let c = station_connectivity(&feed, &station(), 0.5, PEAK);
        assert_eq!(c.stops_in_catchment, 2);
        assert_eq!(c.routes, 2);
        // trips a and b depart inside 07:00-09:00
        assert_eq!(c.peak_trips_per_hour, 1.0);
    }

    #[test]
    fn test_empty_window_uses_zero() {
        let window = PeakWindow {
            start_hour: 9,
            end_hour: 9,
        };
        let c = station_connectivity(&Feed::default(), &station(), 0.5, window);
        assert_eq!(c.routes, 0);
        assert_eq!(c.peak_trips_per_hour, 0.0);
    }

    #[test]
    fn test_window_with_huge_end_hour() {
        let window = PeakWindow {
            start_hour: 7,
            end_hour: u32::MAX,
        };
        assert!(window.contains(8 * 3600));
        assert!(!window.contains(6 * 3600));

        let feed = Feed {
            stops: vec![stop("near", 37.8705, -122.2685)],
            trips: vec![trip("6", "a")],
            stop_times: vec![stop_time("a", "near", "30:00:00")],
            ..Default::default()
        };
        let c = station_connectivity(&feed, &station(), 0.5, window);
        assert_eq!(c.routes, 1);
    }

    #[test]
    fn test_route_features() {
        let shapes = vec![RouteShape {
            route_id: "51B".to_string(),
            short_name: "51B".to_string(),
            long_name: "University Ave".to_string(),
            shape_id: "s51".to_string(),
            points: vec![(-122.27, 37.87), (-122.26, 37.87)],
        }];
        let fc = route_features(&shapes);
        assert_eq!(fc.len(), 1);
        assert_eq!(
            fc.features[0].property_str("route_long_name"),
            Some("University Ave")
        );
        assert!(matches!(
            fc.features[0].geometry,
            Some(crate::geojson::Geometry::LineString(ref pts)) if pts.len() == 2
        ));
    }
}
