//! Census geographic identifiers and study-area filtering.
//!
//! Census GEOIDs nest by fixed-width prefix: a 15-digit block code starts
//! with its 12-digit block group, which starts with its 11-digit tract, and
//! so on up to the 2-digit state. Filtering to a study area means truncating
//! each row's code to the allow-list's level and testing exact membership.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A level of the Census geographic hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoLevel {
    State,
    County,
    Tract,
    BlockGroup,
    Block,
}

impl GeoLevel {
    /// Number of leading characters of a GEOID that identify this level.
    pub const fn width(self) -> usize {
        match self {
            GeoLevel::State => 2,
            GeoLevel::County => 5,
            GeoLevel::Tract => 11,
            GeoLevel::BlockGroup => 12,
            GeoLevel::Block => 15,
        }
    }
}

/// Derives the code for `level` from a longer (or equal) GEOID.
///
/// Returns `None` when `code` is shorter than the level width. Such codes
/// cannot be placed in the hierarchy and are rejected by every filter.
pub fn truncate(code: &str, level: GeoLevel) -> Option<&str> {
    code.get(..level.width())
}

/// The fixed set of identifiers bounding the analysis.
///
/// Every member has exactly the width of `level`; membership is an exact
/// string comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    level: GeoLevel,
    codes: BTreeSet<String>,
}

impl AllowList {
    /// # Errors
    ///
    /// [`PipelineError::InvalidGeocode`] if any code is not exactly
    /// `level.width()` characters long.
    pub fn new<I, S>(level: GeoLevel, codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for code in codes {
            let code = code.into();
            if code.len() != level.width() {
                return Err(PipelineError::InvalidGeocode {
                    code,
                    expected: level.width(),
                });
            }
            set.insert(code);
        }
        Ok(Self { level, codes: set })
    }

    pub fn level(&self) -> GeoLevel {
        self.level
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    /// Exact membership of an identifier already at this list's level.
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Whether a GEOID at this level or finer falls inside the study area.
    pub fn admits(&self, geocode: &str) -> bool {
        truncate(geocode, self.level).is_some_and(|code| self.contains(code))
    }

    /// Lazily keeps the rows whose `key` is admitted.
    pub fn filter<'a, T, I, F>(&'a self, rows: I, key: F) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
        F: Fn(&T) -> &str + 'a,
    {
        rows.into_iter().filter(move |row| self.admits(key(row)))
    }
}
