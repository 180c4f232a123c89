//! LEHD LODES origin-destination flows.
//!
//! Statewide OD files are gzip-compressed CSV, hundreds of megabytes
//! uncompressed. They are decoded as a stream and deserialized one record
//! at a time; only records whose workplace falls inside the study area are
//! kept, so memory is bounded by the size of the study area rather than the
//! state.

use std::io::Read;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::fetch::{HttpClient, fetch_reader};
use crate::geography::{AllowList, GeoLevel, truncate};

/// Records between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 100_000;

const REQUIRED_COLUMNS: [&str; 3] = ["w_geocode", "h_geocode", "S000"];

/// Which LODES OD file to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodesQuery {
    pub base_url: String,
    /// Lowercase postal abbreviation, e.g. `ca`.
    pub state: String,
    /// `main` (both ends in state) or `aux`.
    pub segment: String,
    /// `JT00` is all jobs.
    pub job_type: String,
}

impl Default for LodesQuery {
    fn default() -> Self {
        Self {
            base_url: "https://lehd.ces.census.gov/data/lodes/LODES8".to_string(),
            state: "ca".to_string(),
            segment: "main".to_string(),
            job_type: "JT00".to_string(),
        }
    }
}

impl LodesQuery {
    pub fn od_url(&self, year: u16) -> String {
        format!(
            "{base}/{st}/od/{st}_od_{seg}_{jt}_{year}.csv.gz",
            base = self.base_url,
            st = self.state,
            seg = self.segment,
            jt = self.job_type,
        )
    }
}

/// One home-to-work flow between two census blocks.
///
/// Job counts are non-negative by construction. Columns other than the two
/// geocodes and `S000` default to zero when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdFlow {
    pub w_geocode: String,
    pub h_geocode: String,
    #[serde(rename = "S000")]
    pub s000: u64,
    #[serde(rename = "SA01", default)]
    pub sa01: u64,
    #[serde(rename = "SA02", default)]
    pub sa02: u64,
    #[serde(rename = "SA03", default)]
    pub sa03: u64,
    #[serde(rename = "SE01", default)]
    pub se01: u64,
    #[serde(rename = "SE02", default)]
    pub se02: u64,
    #[serde(rename = "SE03", default)]
    pub se03: u64,
    #[serde(rename = "SI01", default)]
    pub si01: u64,
    #[serde(rename = "SI02", default)]
    pub si02: u64,
    #[serde(rename = "SI03", default)]
    pub si03: u64,
    #[serde(default)]
    pub createdate: String,
}

impl OdFlow {
    pub fn work_tract(&self) -> Option<&str> {
        truncate(&self.w_geocode, GeoLevel::Tract)
    }

    pub fn home_tract(&self) -> Option<&str> {
        truncate(&self.h_geocode, GeoLevel::Tract)
    }
}

/// Output row: a flow plus its derived tract codes.
#[derive(Debug, Serialize)]
pub struct FlowRow<'a> {
    pub w_geocode: &'a str,
    pub h_geocode: &'a str,
    #[serde(rename = "S000")]
    pub s000: u64,
    #[serde(rename = "SA01")]
    pub sa01: u64,
    #[serde(rename = "SA02")]
    pub sa02: u64,
    #[serde(rename = "SA03")]
    pub sa03: u64,
    #[serde(rename = "SE01")]
    pub se01: u64,
    #[serde(rename = "SE02")]
    pub se02: u64,
    #[serde(rename = "SE03")]
    pub se03: u64,
    #[serde(rename = "SI01")]
    pub si01: u64,
    #[serde(rename = "SI02")]
    pub si02: u64,
    #[serde(rename = "SI03")]
    pub si03: u64,
    pub createdate: &'a str,
    pub w_tract: &'a str,
    pub h_tract: &'a str,
}

impl<'a> From<&'a OdFlow> for FlowRow<'a> {
    fn from(f: &'a OdFlow) -> Self {
        FlowRow {
            w_geocode: &f.w_geocode,
            h_geocode: &f.h_geocode,
            s000: f.s000,
            sa01: f.sa01,
            sa02: f.sa02,
            sa03: f.sa03,
            se01: f.se01,
            se02: f.se02,
            se03: f.se03,
            si01: f.si01,
            si02: f.si02,
            si03: f.si03,
            createdate: &f.createdate,
            w_tract: f.work_tract().unwrap_or_default(),
            h_tract: f.home_tract().unwrap_or_default(),
        }
    }
}

/// Streaming iterator over OD records.
pub struct FlowReader<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, OdFlow>,
    seen: u64,
}

impl<R: Read> FlowReader<MultiGzDecoder<R>> {
    /// Reads gzip-compressed CSV.
    ///
    /// # Errors
    ///
    /// See [`FlowReader::plain`]. A body that is not gzip fails here.
    pub fn gzip(reader: R) -> Result<Self> {
        FlowReader::plain(MultiGzDecoder::new(reader))
    }
}

impl<R: Read> FlowReader<R> {
    /// Reads uncompressed CSV.
    ///
    /// # Errors
    ///
    /// The header row is read up front: an undecodable or empty body, or a
    /// header without `w_geocode`, `h_geocode` and `S000`, is rejected.
    pub fn plain(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?;
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(PipelineError::missing_column(column, "LODES OD file"));
            }
        }
        Ok(Self {
            records: rdr.into_deserialize(),
            seen: 0,
        })
    }

    /// Records decoded so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl<R: Read> Iterator for FlowReader<R> {
    type Item = Result<OdFlow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.seen += 1;
        if self.seen % PROGRESS_INTERVAL == 0 {
            info!(records = self.seen, "LODES records scanned");
        }
        Some(record.map_err(Into::into))
    }
}

/// Drains `flows`, keeping only flows whose workplace is in the study area.
///
/// # Errors
///
/// The first decode error aborts the scan.
pub fn retain_workplaces<I>(flows: I, allow: &AllowList) -> Result<Vec<OdFlow>>
where
    I: IntoIterator<Item = Result<OdFlow>>,
{
    let mut kept = Vec::new();
    for flow in flows {
        let flow = flow?;
        if allow.admits(&flow.w_geocode) {
            kept.push(flow);
        }
    }
    Ok(kept)
}

/// Downloads one year of OD flows and keeps those working in the study area.
#[tracing::instrument(skip(client, query, allow), fields(state = %query.state))]
pub fn fetch_workplace_flows<C: HttpClient + ?Sized>(
    client: &C,
    query: &LodesQuery,
    year: u16,
    allow: &AllowList,
) -> Result<Vec<OdFlow>> {
    let url = query.od_url(year);
    info!(url = %url, "Fetching LODES OD file");

    let body = fetch_reader(client, &url)?;
    let mut reader = FlowReader::gzip(body)?;
    let kept = retain_workplaces(&mut reader, allow)?;

    if kept.is_empty() {
        warn!(
            scanned = reader.seen(),
            "No flows with a workplace in the study area"
        );
    } else {
        info!(
            scanned = reader.seen(),
            kept = kept.len(),
            jobs = kept.iter().map(|f| f.s000).sum::<u64>(),
            "LODES flows filtered"
        );
    }
    Ok(kept)
}
