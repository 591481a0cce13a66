// The input series handed to the pipeline.
//
// A `SampleTable` is the typed, row-ordered view of the tabular data source:
// the header names that were present in the source plus one `Sample` per
// row. Every value except the timestamp may be missing; missing values are
// filled later by `normalize.rs`, never here. Column presence is tracked
// separately from cell values because an absent column is fatal while an
// empty cell is not.
//
// Tables are built by `source.rs` (CSV) or directly by callers and tests.
// `ephemeris::annotate` can fill in the solar columns for tables that only
// carry timestamps and cloud cover.

use crate::config::ColumnNames;
use crate::error::{Result, SonifyError};
use chrono::{NaiveDate, NaiveDateTime};

/// One row of the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Local clock time of the measurement.
    pub timestamp: NaiveDateTime,
    /// Low cloud cover in percent (0-100), if measured.
    pub cloud_cover_pct: Option<f64>,
    /// Cyclical solar proxy (0 to the configured range), if known.
    pub solar_proxy: Option<f64>,
    pub sunrise_flag: Option<bool>,
    pub sunset_flag: Option<bool>,
}

impl Sample {
    /// A sample with only a timestamp and a cloud reading.
    pub fn new(timestamp: NaiveDateTime, cloud_cover_pct: Option<f64>) -> Self {
        Sample {
            timestamp,
            cloud_cover_pct,
            solar_proxy: None,
            sunrise_flag: None,
            sunset_flag: None,
        }
    }

    /// The calendar date used for ephemeris lookup.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Row-ordered samples plus the set of columns the source provided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    columns: Vec<String>,
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn new(columns: Vec<String>, samples: Vec<Sample>) -> Self {
        SampleTable { columns, samples }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Register a column as present (no-op if it already is).
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    /// Fail with `MissingColumn` for the first required column that is absent.
    pub fn require_columns(&self, names: &ColumnNames) -> Result<()> {
        match names.required().into_iter().find(|name| !self.has_column(name)) {
            Some(missing) => Err(SonifyError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}
