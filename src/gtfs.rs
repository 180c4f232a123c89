//! GTFS static feed tables and study-area route queries.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::output::read_records;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    pub stop_name: Option<String>,
    /// Empty for generic nodes and boarding areas.
    pub stop_lat: Option<f64>,
    pub stop_lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    pub route_id: String,
    pub trip_id: String,
    pub shape_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: Option<String>,
    pub departure_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShapePoint {
    pub shape_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
}

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// The route's display geometry: its first shape, ordered by sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteShape {
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
    pub shape_id: String,
    /// `(lon, lat)` pairs.
    pub points: Vec<(f64, f64)>,
}

/// The five GTFS tables the route-network analysis reads.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub routes: Vec<Route>,
    pub stops: Vec<Stop>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTime>,
    pub shapes: Vec<ShapePoint>,
}

impl Feed {
    /// Loads `routes.txt`, `stops.txt`, `trips.txt`, `stop_times.txt` and
    /// `shapes.txt` from `dir`.
    ///
    /// # Errors
    ///
    /// [`crate::error::PipelineError::MissingFile`] if any table is absent.
    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self> {
        let feed = Self {
            routes: read_records(&dir.join("routes.txt"))?,
            stops: read_records(&dir.join("stops.txt"))?,
            trips: read_records(&dir.join("trips.txt"))?,
            stop_times: read_records(&dir.join("stop_times.txt"))?,
            shapes: read_records(&dir.join("shapes.txt"))?,
        };
        info!(
            routes = feed.routes.len(),
            stops = feed.stops.len(),
            trips = feed.trips.len(),
            stop_times = feed.stop_times.len(),
            shape_points = feed.shapes.len(),
            "GTFS feed loaded"
        );
        Ok(feed)
    }

    /// Stops whose coordinates fall inside `bbox`.
    pub fn stops_within(&self, bbox: &BoundingBox) -> HashSet<&str> {
        self.stops
            .iter()
            .filter(|s| match (s.stop_lat, s.stop_lon) {
                (Some(lat), Some(lon)) => bbox.contains(lat, lon),
                _ => false,
            })
            .map(|s| s.stop_id.as_str())
            .collect()
    }

    /// Routes with at least one trip calling at `stops`, in the order they
    /// first appear in `trips.txt`.
    pub fn routes_serving(&self, stops: &HashSet<&str>) -> Vec<&str> {
        let trips: HashSet<&str> = self
            .stop_times
            .iter()
            .filter(|st| st.stop_id.as_deref().is_some_and(|id| stops.contains(id)))
            .map(|st| st.trip_id.as_str())
            .collect();

        let mut seen = HashSet::new();
        self.trips
            .iter()
            .filter(|t| trips.contains(t.trip_id.as_str()))
            .map(|t| t.route_id.as_str())
            .filter(|route_id| seen.insert(*route_id))
            .collect()
    }

    /// First usable shape for each of the first `max_routes` routes.
    ///
    /// A shape already drawn for an earlier route, or with fewer than two
    /// points, is skipped.
    pub fn route_shapes(&self, route_ids: &[&str], max_routes: usize) -> Vec<RouteShape> {
        let routes: HashMap<&str, &Route> = self
            .routes
            .iter()
            .map(|r| (r.route_id.as_str(), r))
            .collect();

        let mut points: HashMap<&str, Vec<&ShapePoint>> = HashMap::new();
        for pt in &self.shapes {
            points.entry(pt.shape_id.as_str()).or_default().push(pt);
        }

        let mut drawn = HashSet::new();
        let mut out = Vec::new();

        for &route_id in route_ids.iter().take(max_routes) {
            let Some(shape_id) = self
                .trips
                .iter()
                .filter(|t| t.route_id == route_id)
                .find_map(|t| t.shape_id.as_deref())
            else {
                continue;
            };
            if !drawn.insert(shape_id) {
                continue;
            }

            let mut pts = points.get(shape_id).cloned().unwrap_or_default();
            if pts.len() < 2 {
                continue;
            }
            pts.sort_by_key(|p| p.shape_pt_sequence);

            let Some(route) = routes.get(route_id) else {
                warn!(route_id, "Trip references a route missing from routes.txt");
                continue;
            };

            out.push(RouteShape {
                route_id: route_id.to_string(),
                short_name: route.route_short_name.clone().unwrap_or_default(),
                long_name: route.route_long_name.clone().unwrap_or_default(),
                shape_id: shape_id.to_string(),
                points: pts
                    .iter()
                    .map(|p| (p.shape_pt_lon, p.shape_pt_lat))
                    .collect(),
            });
        }
        out
    }
}

/// Seconds after midnight for a GTFS `HH:MM:SS` time. Hours may exceed 23.
pub fn parse_gtfs_time(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let h: u32 = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let s: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || m > 59 || s > 59 {
        return None;
    }
    h.checked_mul(3600)?.checked_add(m * 60 + s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, lat: f64, lon: f64) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_name: None,
            stop_lat: Some(lat),
            stop_lon: Some(lon),
        }
    }

    fn trip(route: &str, id: &str, shape: Option<&str>) -> Trip {
        Trip {
            route_id: route.to_string(),
            trip_id: id.to_string(),
            shape_id: shape.map(str::to_string),
        }
    }

    fn stop_time(trip: &str, stop: &str) -> StopTime {
        StopTime {
            trip_id: trip.to_string(),
            stop_id: Some(stop.to_string()),
            departure_time: None,
        }
    }

    fn shape_pt(shape: &str, seq: u32, lon: f64) -> ShapePoint {
        ShapePoint {
            shape_id: shape.to_string(),
            shape_pt_lat: 37.87,
            shape_pt_lon: lon,
            shape_pt_sequence: seq,
        }
    }

    fn route(id: &str) -> Route {
        Route {
            route_id: id.to_string(),
            route_short_name: Some(id.to_string()),
            route_long_name: None,
        }
    }

    fn berkeley_box() -> BoundingBox {
        BoundingBox {
            min_lat: 37.85,
            max_lat: 37.88,
            min_lon: -122.30,
            max_lon: -122.25,
        }
    }

    fn feed() -> Feed {
        Feed {
            routes: vec![route("51B"), route("6"), route("F")],
            stops: vec![
                stop("in1", 37.87, -122.268),
                stop("in2", 37.853, -122.27),
                stop("out", 37.80, -122.27),
            ],
            trips: vec![
                trip("6", "t1", Some("s6")),
                trip("51B", "t2", Some("s51")),
                trip("6", "t3", Some("s6")),
                trip("F", "t4", Some("sF")),
            ],
            stop_times: vec![
                stop_time("t2", "in1"),
                stop_time("t1", "in2"),
                stop_time("t3", "in1"),
                stop_time("t4", "out"),
            ],
            shapes: vec![
                shape_pt("s51", 2, -122.26),
                shape_pt("s51", 1, -122.27),
                shape_pt("s6", 1, -122.28),
            ],
        }
    }

    #[test]
    fn test_stops_within_box() {
        let feed = feed();
        let stops = feed.stops_within(&berkeley_box());
        assert_eq!(stops.len(), 2);
        assert!(!stops.contains("out"));
    }

    #[test]
    fn test_routes_serving_in_trip_order() {
        let feed = feed();
        let stops = feed.stops_within(&berkeley_box());
        assert_eq!(feed.routes_serving(&stops), vec!["6", "51B"]);
    }

    #[test]
    fn test_route_shapes_sorted_and_skip_short() {
        let feed = feed();
        let shapes = feed.route_shapes(&["6", "51B"], 30);
        // s6 has a single point
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].route_id, "51B");
        assert_eq!(shapes[0].points, vec![(-122.27, 37.87), (-122.26, 37.87)]);
    }

    #[test]
    fn test_route_shapes_respects_cap() {
        let feed = feed();
        assert!(feed.route_shapes(&["6", "51B"], 1).is_empty());
    }

    #[test]
    fn test_parse_gtfs_time() {
        assert_eq!(parse_gtfs_time("07:30:00"), Some(27_000));
        assert_eq!(parse_gtfs_time("25:00:00"), Some(90_000));
        assert_eq!(parse_gtfs_time("7:5"), None);
        assert_eq!(parse_gtfs_time("07:61:00"), None);
        assert_eq!(parse_gtfs_time("2000000:00:00"), None);
        assert_eq!(parse_gtfs_time("1193046:28:15"), Some(u32::MAX));
    }

    #[test]
    fn test_load_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("routes.txt"), "route_id\n1\n").unwrap();
        let err = Feed::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("stops.txt"));
    }
}
