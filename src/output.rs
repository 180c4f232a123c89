//! Output persistence for derived tables.
//!
//! Supports CSV overwrite, CSV append, and JSON run summaries.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes `rows` to a fresh CSV file with a header row, replacing any
/// existing file. Returns the number of data rows written.
pub fn write_records<T, I>(path: &Path, rows: I) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = count, "CSV written");
    Ok(count)
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");
    ensure_parent(path)?;

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Reads every row of a CSV file into `T`.
pub fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    crate::error::require_file(path)?;
    let file = File::open(path)?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result?;
        rows.push(record);
    }
    debug!(path = %path.display(), rows = rows.len(), "CSV read");
    Ok(rows)
}

/// A JSON document stamped with its generation time.
#[derive(Debug, Serialize)]
pub struct Summary<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    pub analysis: &'a str,
    pub results: &'a T,
}

/// Writes `results` as pretty JSON wrapped in a [`Summary`].
pub fn write_summary<T: Serialize>(path: &Path, analysis: &str, results: &T) -> Result<()> {
    ensure_parent(path)?;
    let summary = Summary {
        generated_at: Utc::now(),
        analysis,
        results,
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &summary)?;
    info!(path = %path.display(), analysis, "Summary written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Row {
        geoid: String,
        pct_no_vehicle: Option<f64>,
    }

    fn row(geoid: &str, pct: Option<f64>) -> Row {
        Row {
            geoid: geoid.to_string(),
            pct_no_vehicle: pct,
        }
    }

    #[test]
    fn test_write_records_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/rows.csv");

        write_records(&path, [row("a", Some(1.0)), row("b", None)]).unwrap();
        let n = write_records(&path, [row("c", Some(2.5))]).unwrap();

        assert_eq!(n, 1);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "geoid,pct_no_vehicle\nc,2.5\n");
    }

    #[test]
    fn test_missing_values_round_trip_as_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");

        write_records(&path, [row("a", None)]).unwrap();
        let back: Vec<Row> = read_records(&path).unwrap();
        assert_eq!(back, vec![row("a", None)]);
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.csv");

        append_record(&path, &row("a", Some(1.0))).unwrap();
        append_record(&path, &row("b", Some(2.0))).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("geoid")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_read_records_missing_file() {
        let err = read_records::<Row>(Path::new("missing/input.csv")).unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::MissingFile { .. }));
    }

    #[test]
    fn test_write_summary_has_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary(&path, "test", &vec![1, 2, 3]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value["generated_at"].is_string());
        assert_eq!(value["analysis"], "test");
        assert_eq!(value["results"], serde_json::json!([1, 2, 3]));
    }
}
