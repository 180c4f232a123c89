//! Derived-metric analyses.
//!
//! Each module turns fetched or configured inputs into chart-ready rows:
//! commute flows, demographics, station comparisons, the bus network around
//! stations, remote-work and returner breakdowns, and service quality.

pub mod classify;
pub mod commute;
pub mod demographics;
pub mod network;
pub mod remote_work;
pub mod returners;
pub mod service;
pub mod stations;
