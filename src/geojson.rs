//! Minimal GeoJSON (RFC 7946) feature collections.
//!
//! Only what the report layers need: points, line strings and (multi)
//! polygons with free-form properties.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Result, require_file};
use crate::geography::AllowList;

/// `[longitude, latitude]`, optionally followed by altitude.
pub type Position = Vec<f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    FeatureCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureTag,
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let properties = Option::<Map<String, Value>>::deserialize(d)?;
    Ok(properties.unwrap_or_default())
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            kind: FeatureTag::Feature,
            geometry: Some(geometry),
            properties,
        }
    }

    pub fn point(lon: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self::new(Geometry::Point(vec![lon, lat]), properties)
    }

    /// A line through `(lon, lat)` pairs.
    pub fn line(points: &[(f64, f64)], properties: Map<String, Value>) -> Self {
        let coords = points.iter().map(|&(lon, lat)| vec![lon, lat]).collect();
        Self::new(Geometry::LineString(coords), properties)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key)?.as_str()
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key)?.as_f64()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: CollectionTag,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionTag::FeatureCollection,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Non-null values of a numeric property across all features.
    pub fn numeric_property(&self, key: &str) -> Vec<f64> {
        self.features
            .iter()
            .filter_map(|f| f.property_f64(key))
            .collect()
    }

    /// Left join: copies `rows[feature[key]]` into each matching feature's
    /// properties. Features without a match are kept unchanged. Returns the
    /// number of matched features.
    pub fn join_properties(
        &mut self,
        key: &str,
        rows: &HashMap<String, Map<String, Value>>,
    ) -> usize {
        let mut matched = 0;
        for feature in &mut self.features {
            let Some(id) = feature.property_str(key).map(str::to_string) else {
                continue;
            };
            if let Some(extra) = rows.get(&id) {
                for (k, v) in extra {
                    feature.properties.insert(k.clone(), v.clone());
                }
                matched += 1;
            }
        }
        debug!(matched, total = self.features.len(), "Properties joined");
        matched
    }

    /// Keeps the features whose `key` property is admitted by `allow`.
    pub fn retain_admitted(self, key: &str, allow: &AllowList) -> Self {
        let features = allow
            .filter(self.features, |f: &Feature| {
                f.property_str(key).unwrap_or_default()
            })
            .collect();
        Self::new(features)
    }
}

/// Reads a FeatureCollection from disk.
pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    require_file(path)?;
    let file = File::open(path)?;
    let fc: FeatureCollection = serde_json::from_reader(BufReader::new(file))?;
    debug!(path = %path.display(), features = fc.len(), "GeoJSON read");
    Ok(fc)
}

/// Writes a FeatureCollection, creating parent directories.
pub fn write_feature_collection(path: &Path, fc: &FeatureCollection) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), fc)?;
    info!(path = %path.display(), features = fc.len(), "GeoJSON written");
    Ok(())
}

/// Builds a property map from a serializable record.
///
/// Non-object values produce an empty map.
pub fn properties_of<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
