pub mod analyzers;
pub mod census;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geography;
pub mod geojson;
pub mod gtfs;
pub mod lodes;
pub mod metrics;
pub mod output;
