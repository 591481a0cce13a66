// CSV readers for sample tables and measured solar tables.
//
// This is the thin boundary between files and the pipeline. It reads a
// cleaned, single-section CSV whose headers already name the columns; it
// does not split multi-section exports or guess column names.
//
// Timestamps come from either a `date` + `time` column pair or one of
// `datetime`, `timestamp`, `time` holding a full ISO-8601 local time.
// Empty cells (and `nan`) load as missing values. Booleans accept
// `true`/`false` in any case and `1`/`0`.
//
// A column missing from the file is not an error here; the pipeline decides
// which columns are required.

use crate::config::ColumnNames;
use crate::ephemeris::{SolarDay, SolarTable};
use crate::error::{Result, SonifyError};
use crate::sample::{Sample, SampleTable};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Date column of a measured solar table.
pub const SOLAR_DATE_COLUMN: &str = "time";
/// Sunrise column of a measured solar table.
pub const SOLAR_SUNRISE_COLUMN: &str = "sunrise (iso8601)";
/// Sunset column of a measured solar table.
pub const SOLAR_SUNSET_COLUMN: &str = "sunset (iso8601)";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// Where a row's timestamp lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeLayout {
    Combined(usize),
    Split { date: usize, time: usize },
}

impl TimeLayout {
    fn detect(headers: &[String]) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        if let (Some(date), Some(time)) = (find("date"), find("time")) {
            return Ok(TimeLayout::Split { date, time });
        }
        ["datetime", "timestamp", "time"]
            .into_iter()
            .find_map(find)
            .map(TimeLayout::Combined)
            .ok_or_else(|| SonifyError::MissingColumn("datetime".to_string()))
    }

    fn parse(&self, headers: &[String], record: &StringRecord, row: usize) -> Result<NaiveDateTime> {
        match *self {
            TimeLayout::Combined(idx) => {
                let raw = field(record, idx);
                parse_datetime(raw).ok_or_else(|| malformed(&headers[idx], row, raw))
            }
            TimeLayout::Split { date, time } => {
                let raw_date = field(record, date);
                let raw_time = field(record, time);
                let d = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
                    .map_err(|_| malformed(&headers[date], row, raw_date))?;
                let t = TIME_FORMATS
                    .iter()
                    .find_map(|f| NaiveTime::parse_from_str(raw_time, f).ok())
                    .ok_or_else(|| malformed(&headers[time], row, raw_time))?;
                Ok(d.and_time(t))
            }
        }
    }
}

/// Load a sample table from a CSV file.
pub fn load_samples(path: &Path, columns: &ColumnNames) -> Result<SampleTable> {
    let file = std::fs::File::open(path)?;
    let table = read_samples(file, columns)?;
    info!(path = %path.display(), rows = table.len(), "loaded samples");
    Ok(table)
}

/// Read a sample table from CSV text.
pub fn read_samples<R: Read>(reader: R, columns: &ColumnNames) -> Result<SampleTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let layout = TimeLayout::detect(&headers)?;
    let index_of = |name: &str| headers.iter().position(|h| h == name);
    let cloud = index_of(&columns.cloud_cover);
    let proxy = index_of(&columns.solar_proxy);
    let sunrise = index_of(&columns.sunrise);
    let sunset = index_of(&columns.sunset);

    let mut samples = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        samples.push(Sample {
            timestamp: layout.parse(&headers, &record, row)?,
            cloud_cover_pct: optional(&headers, &record, cloud, row, parse_float)?,
            solar_proxy: optional(&headers, &record, proxy, row, parse_float)?,
            sunrise_flag: optional(&headers, &record, sunrise, row, parse_bool)?,
            sunset_flag: optional(&headers, &record, sunset, row, parse_bool)?,
        });
    }

    Ok(SampleTable::new(headers, samples))
}

/// Load a measured sunrise/sunset table from a CSV file.
pub fn load_solar_table(path: &Path) -> Result<SolarTable> {
    let file = std::fs::File::open(path)?;
    let table = read_solar_table(file)?;
    info!(path = %path.display(), days = table.len(), "loaded solar table");
    Ok(table)
}

/// Read a measured sunrise/sunset table from CSV text.
pub fn read_solar_table<R: Read>(reader: R) -> Result<SolarTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let require = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SonifyError::MissingColumn(name.to_string()))
    };
    let date_idx = require(SOLAR_DATE_COLUMN)?;
    let sunrise_idx = require(SOLAR_SUNRISE_COLUMN)?;
    let sunset_idx = require(SOLAR_SUNSET_COLUMN)?;

    let mut table = SolarTable::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let raw_date = field(&record, date_idx);
        let date = parse_date(raw_date).ok_or_else(|| malformed(SOLAR_DATE_COLUMN, row, raw_date))?;
        let raw_sunrise = field(&record, sunrise_idx);
        let sunrise = parse_datetime(raw_sunrise)
            .ok_or_else(|| malformed(SOLAR_SUNRISE_COLUMN, row, raw_sunrise))?;
        let raw_sunset = field(&record, sunset_idx);
        let sunset = parse_datetime(raw_sunset)
            .ok_or_else(|| malformed(SOLAR_SUNSET_COLUMN, row, raw_sunset))?;
        table.insert(SolarDay::measured(date, sunrise, sunset))?;
    }
    Ok(table)
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn optional<T>(
    headers: &[String],
    record: &StringRecord,
    idx: Option<usize>,
    row: usize,
    parse: fn(&str) -> std::result::Result<Option<T>, ()>,
) -> Result<Option<T>> {
    let Some(idx) = idx else {
        return Ok(None);
    };
    let raw = field(record, idx);
    parse(raw).map_err(|_| malformed(&headers[idx], row, raw))
}

fn parse_float(raw: &str) -> std::result::Result<Option<f64>, ()> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| ())
}

fn parse_bool(raw: &str) -> std::result::Result<Option<bool>, ()> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Ok(Some(true))
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Ok(Some(false))
    } else {
        Err(())
    }
}

/// Parse a date, accepting a full timestamp and keeping its date part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
}

fn malformed(column: &str, row: usize, value: &str) -> SonifyError {
    SonifyError::MalformedValue {
        column: column.to_string(),
        row,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEANED: &str = "\
date,time,hour,cycle,solar_sine,sunrise_event,sunset_event,cloud_cover_low (%)
2024-06-01,05:00,5,night,1.2,False,False,40
2024-06-01,06:00,6,day,3.0,True,False,
2024-06-01,18:00,18,day,3.0,False,True,100
";

    #[test]
    fn test_read_cleaned_csv() {
        let table = read_samples(CLEANED.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.require_columns(&ColumnNames::default()).is_ok());

        let first = &table.samples()[0];
        assert_eq!(
            first.timestamp,
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(5, 0, 0)
                .unwrap()
        );
        assert_eq!(first.cloud_cover_pct, Some(40.0));
        assert_eq!(first.solar_proxy, Some(1.2));
        assert_eq!(first.sunrise_flag, Some(false));

        let second = &table.samples()[1];
        assert_eq!(second.cloud_cover_pct, None);
        assert_eq!(second.sunrise_flag, Some(true));
        assert_eq!(table.samples()[2].sunset_flag, Some(true));
    }

    #[test]
    fn test_combined_timestamp_column() {
        let csv = "time,cloud_cover_low (%)\n2024-06-01T13:15,20\n";
        let table = read_samples(csv.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.samples()[0].timestamp.to_string(), "2024-06-01 13:15:00");
        assert_eq!(table.samples()[0].solar_proxy, None);
        assert!(matches!(
            table.require_columns(&ColumnNames::default()),
            Err(SonifyError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_no_time_column() {
        let csv = "cloud_cover_low (%)\n20\n";
        assert!(matches!(
            read_samples(csv.as_bytes(), &ColumnNames::default()),
            Err(SonifyError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_malformed_cells_report_location() {
        let csv = "datetime,cloud_cover_low (%)\n2024-06-01T00:00,cloudy\n";
        match read_samples(csv.as_bytes(), &ColumnNames::default()) {
            Err(SonifyError::MalformedValue { column, row, value }) => {
                assert_eq!(column, "cloud_cover_low (%)");
                assert_eq!(row, 1);
                assert_eq!(value, "cloudy");
            }
            other => panic!("expected MalformedValue, got {other:?}"),
        }

        let csv = "datetime,sunrise_event\n2024-06-01T00:00,maybe\n";
        assert!(read_samples(csv.as_bytes(), &ColumnNames::default()).is_err());
    }

    #[test]
    fn test_read_solar_table() {
        let csv = "\
time,sunrise (iso8601),sunset (iso8601)
2024-06-01,2024-06-01T05:48,2024-06-01T20:22
2024-06-02,2024-06-02T05:47,2024-06-02T20:23
";
        let table = read_solar_table(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let day = table
            .get(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();
        assert_eq!(day.solar_noon.to_string(), "2024-06-01 13:05:00");
    }

    #[test]
    fn test_solar_table_requires_columns() {
        let csv = "time,sunrise (iso8601)\n2024-06-01,2024-06-01T05:48\n";
        assert!(matches!(
            read_solar_table(csv.as_bytes()),
            Err(SonifyError::MissingColumn(name)) if name == SOLAR_SUNSET_COLUMN
        ));
    }
}
