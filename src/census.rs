//! American Community Survey block-group demographics.
//!
//! The Census API answers with a JSON array of arrays whose first row is the
//! header. Every value arrives as a string (or `null`); numeric columns are
//! coerced, and anything unparsable or negative is treated as missing.
//! Negative estimates are ACS annotation codes such as `-666666666`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::fetch::{HttpClient, fetch_json};
use crate::metrics::{pct_opt, round_to};

/// ACS 5-year estimates, 2021 vintage.
pub const ACS5_2021_URL: &str = "https://api.census.gov/data/2021/acs/acs5";

/// Requested ACS variables and the column names they are stored under.
pub const VARIABLES: &[(&str, &str)] = &[
    ("B19013_001E", "median_household_income"),
    ("B01003_001E", "total_population"),
    ("B14001_001E", "total_enrollment"),
    ("B14001_009E", "college_grad_enrollment"),
    ("B25044_001E", "total_households"),
    ("B25044_003E", "no_vehicle_owner"),
    ("B25044_010E", "no_vehicle_renter"),
    ("B23025_001E", "pop_in_labor_force_universe"),
    ("B23025_003E", "in_labor_force"),
    ("B23025_005E", "unemployed"),
    ("B25001_001E", "total_housing_units"),
];

const GEO_COLUMNS: [&str; 4] = ["state", "county", "tract", "block group"];

/// Where and what to ask the Census API for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusQuery {
    pub base_url: String,
    pub state_fips: String,
    pub county_fips: String,
}

impl Default for CensusQuery {
    fn default() -> Self {
        Self {
            base_url: ACS5_2021_URL.to_string(),
            state_fips: "06".to_string(),
            county_fips: "001".to_string(),
        }
    }
}

impl CensusQuery {
    /// URL for every block group in the configured county.
    pub fn block_group_url(&self) -> String {
        let vars: Vec<&str> = VARIABLES.iter().map(|(code, _)| *code).collect();
        format!(
            "{}?get=NAME,{}&for=block%20group:*&in=state:{}&in=county:{}",
            self.base_url,
            vars.join(","),
            self.state_fips,
            self.county_fips
        )
    }
}

/// A header row plus data rows, all values kept as optional strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    source: String,
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Builds a table from a Census-style array of arrays.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Parse`] for an empty payload, a non-string header
    /// cell, or a row whose length differs from the header.
    pub fn from_json_rows(payload: Vec<Vec<Value>>, source: &str) -> Result<Self> {
        let mut rows = payload.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| {
                PipelineError::Parse(format!("{source}: empty payload, no header row"))
            })?;

        let columns = header
            .into_iter()
            .map(|cell| match cell {
                Value::String(s) => Ok(s),
                other => Err(PipelineError::Parse(format!(
                    "{source}: header cell is not a string: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut data = Vec::new();
        for (i, row) in rows.enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::Parse(format!(
                    "{source}: row {} has {} values, header has {}",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
            data.push(row.into_iter().map(cell_text).collect());
        }

        Ok(Self {
            source: source.to_string(),
            columns,
            rows: data,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::missing_column(name, &self.source))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

fn cell_text(cell: Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Numeric coercion: missing, unparsable, non-finite or negative values
/// become `None`.
pub fn coerce(value: Option<&str>) -> Option<f64> {
    let v: f64 = value?.trim().parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

/// One ACS block group with raw estimates and derived shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockGroup {
    #[serde(rename = "GEOID")]
    pub geoid: String,
    #[serde(rename = "NAME")]
    pub name: String,
    pub median_household_income: Option<f64>,
    pub total_population: Option<f64>,
    pub total_enrollment: Option<f64>,
    pub college_grad_enrollment: Option<f64>,
    pub total_households: Option<f64>,
    pub no_vehicle_owner: Option<f64>,
    pub no_vehicle_renter: Option<f64>,
    pub pop_in_labor_force_universe: Option<f64>,
    pub in_labor_force: Option<f64>,
    pub unemployed: Option<f64>,
    pub total_housing_units: Option<f64>,

    // derived
    pub student_population: Option<f64>,
    pub pct_students: Option<f64>,
    pub households_no_vehicle: Option<f64>,
    pub pct_no_vehicle: Option<f64>,
    pub unemployment_rate: Option<f64>,
}

impl BlockGroup {
    /// Fills the derived columns from the raw estimates.
    ///
    /// Graduate/professional enrollment stands in for the student
    /// population. Percentages are rounded to two places.
    pub fn with_derived(mut self) -> Self {
        self.student_population = self.college_grad_enrollment;
        self.pct_students =
            pct_opt(self.student_population, self.total_population).map(|p| round_to(p, 2));

        self.households_no_vehicle = match (self.no_vehicle_owner, self.no_vehicle_renter) {
            (Some(owner), Some(renter)) => Some(owner + renter),
            _ => None,
        };
        self.pct_no_vehicle =
            pct_opt(self.households_no_vehicle, self.total_households).map(|p| round_to(p, 2));

        self.unemployment_rate =
            pct_opt(self.unemployed, self.in_labor_force).map(|p| round_to(p, 2));
        self
    }
}

/// Converts an ACS block-group table into typed records.
///
/// # Errors
///
/// [`PipelineError::MissingColumn`] if any geography column, `NAME`, or
/// requested variable is absent.
pub fn parse_block_groups(table: &Table) -> Result<Vec<BlockGroup>> {
    let name_idx = table.column_index("NAME")?;
    let geo_idx = GEO_COLUMNS
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<Vec<_>>>()?;
    let var_idx = VARIABLES
        .iter()
        .map(|(code, _)| table.column_index(code))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Vec::with_capacity(table.len());
    for row in table.rows() {
        let text = move |i: usize| row[i].as_deref();
        let num = |slot: usize| coerce(text(var_idx[slot]));

        let geoid: String = geo_idx
            .iter()
            .map(|&i| text(i).unwrap_or_default())
            .collect();

        let bg = BlockGroup {
            geoid,
            name: text(name_idx).unwrap_or_default().to_string(),
            median_household_income: num(0),
            total_population: num(1),
            total_enrollment: num(2),
            college_grad_enrollment: num(3),
            total_households: num(4),
            no_vehicle_owner: num(5),
            no_vehicle_renter: num(6),
            pop_in_labor_force_universe: num(7),
            in_labor_force: num(8),
            unemployed: num(9),
            total_housing_units: num(10),
            ..Default::default()
        };
        out.push(bg.with_derived());
    }

    debug!(rows = out.len(), "Block groups parsed");
    Ok(out)
}

/// Fetches and parses every block group in the configured county.
#[tracing::instrument(skip_all, fields(state = %query.state_fips, county = %query.county_fips))]
pub fn fetch_block_groups<C: HttpClient + ?Sized>(
    client: &C,
    query: &CensusQuery,
) -> Result<Vec<BlockGroup>> {
    let url = query.block_group_url();
    info!(variables = VARIABLES.len(), "Fetching ACS block groups");

    let payload: Vec<Vec<Value>> = fetch_json(client, &url)?;
    let table = Table::from_json_rows(payload, "Census ACS response")?;
    let block_groups = parse_block_groups(&table)?;

    info!(block_groups = block_groups.len(), "ACS block groups fetched");
    Ok(block_groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::fake::StaticClient;
    use serde_json::json;

    fn header() -> Vec<Value> {
        let mut h = vec![json!("NAME")];
        h.extend(VARIABLES.iter().map(|(code, _)| json!(code)));
        h.extend(GEO_COLUMNS.iter().map(|c| json!(c)));
        h
    }

    /// `values` holds the eleven variable cells, whitespace separated.
    fn row(values: &str, tract: &str, bg: &str) -> Vec<Value> {
        let mut r = vec![json!(format!("Block Group {bg}, Census Tract {tract}"))];
        r.extend(values.split_whitespace().map(|v| json!(v)));
        r.extend([json!("06"), json!("001"), json!(tract), json!(bg)]);
        r
    }

    #[test]
    fn test_block_group_url() {
        let url = CensusQuery::default().block_group_url();
        let prefix = "https://api.census.gov/data/2021/acs/acs5?get=NAME,B19013_001E,";
        let suffix = "&for=block%20group:*&in=state:06&in=county:001";
        assert!(url.starts_with(prefix), "{url}");
        assert!(url.ends_with(suffix), "{url}");
    }

    #[test]
    fn test_parse_derives_geoid_and_percentages() {
        const VALUES: &str = "63596 1000 400 150 400 30 102 900 600 30 420";
        let payload = vec![
            header(),
            row(VALUES, "422200", "1"),
        ];
        let table = Table::from_json_rows(payload, "test").unwrap();
        let rows = parse_block_groups(&table).unwrap();

        assert_eq!(rows.len(), 1);
        let bg = &rows[0];
        assert_eq!(bg.geoid, "060014222001");
        assert_eq!(bg.households_no_vehicle, Some(132.0));
        assert_eq!(bg.pct_no_vehicle, Some(33.0));
        assert_eq!(bg.pct_students, Some(15.0));
        assert_eq!(bg.unemployment_rate, Some(5.0));
    }

    #[test]
    fn test_annotation_values_become_missing() {
        let payload = vec![
            header(),
            row("-666666666 0 0 0 0 0 0 0 0 0 0", "400500", "2"),
        ];
        let table = Table::from_json_rows(payload, "test").unwrap();
        let bg = &parse_block_groups(&table).unwrap()[0];

        assert_eq!(bg.median_household_income, None);
        // zero denominator: defined sentinel, not missing
        assert_eq!(bg.pct_no_vehicle, Some(0.0));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(Some("12.5")), Some(12.5));
        assert_eq!(coerce(Some(" 7 ")), Some(7.0));
        assert_eq!(coerce(Some("N/A")), None);
        assert_eq!(coerce(Some("-1")), None);
        assert_eq!(coerce(None), None);
    }

    #[test]
    fn test_missing_variable_column() {
        let payload = vec![vec![json!("NAME"), json!("state")]];
        let table = Table::from_json_rows(payload, "test").unwrap();
        assert!(table.is_empty());
        let err = parse_block_groups(&table).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let payload = vec![vec![json!("NAME"), json!("state")], vec![json!("x")]];
        let err = Table::from_json_rows(payload, "test").unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_empty_payload_is_parse_error() {
        let err = Table::from_json_rows(Vec::new(), "test").unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_fetch_block_groups_through_client() {
        let payload = json!([
            header(),
            row("1 2 3 4 5 6 7 8 9 10 11", "400500", "1"),
            row("1 2 3 4 5 6 7 8 9 10 11", "400700", "3"),
        ]);
        let client = StaticClient::ok(serde_json::to_vec(&payload).unwrap());

        let rows = fetch_block_groups(&client, &CensusQuery::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].geoid, "060014007003");
        assert_eq!(client.requested_urls().len(), 1);
    }
}
