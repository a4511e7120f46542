//! Flat-file event tables for downstream plotting and statistics.
//!
//! Tables are comma-delimited with a fixed header row. Floats are written
//! with Rust's shortest round-trip formatting, so reloading a table
//! reproduces every field exactly; dates use `%Y-%m-%d` and timestamps
//! `%Y-%m-%d %H:%M`. The probability summary is additionally persisted as
//! pretty-printed JSON.

use crate::compound::CompoundStats;
use crate::core_types::events::{CompoundPair, MhwEvent, RiEvent, StormCategory};
use crate::core_types::grid::GridCell;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const MHW_HEADER: &str =
    "lat,lon,date_start,date_end,duration,intensity_max,intensity_mean,intensity_cumulative";
const RI_HEADER: &str = "storm_id,storm_name,onset_time,onset_lat,onset_lon,end_time,\
                         start_wind_kt,end_wind_kt,wind_change_kt,duration_hours,category";
const COMPOUND_HEADER: &str = "mhw_index,ri_index,distance_km,lag_days";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Errors from reading or writing event tables.
#[derive(Debug)]
pub enum TableError {
    /// Failed to write a file
    WriteFailed(String),
    /// Failed to read a file
    ReadFailed(String),
    /// A row does not match the table schema
    ParseFailed { line: usize, message: String },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::WriteFailed(msg) => write!(f, "Failed to write: {msg}"),
            TableError::ReadFailed(msg) => write!(f, "Failed to read: {msg}"),
            TableError::ParseFailed { line, message } => {
                write!(f, "Failed to parse line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for TableError {}

fn parse_field<T>(raw: &str, line: usize, column: &str) -> Result<T, TableError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e| TableError::ParseFailed {
        line,
        message: format!("column '{column}': {e}"),
    })
}

fn parse_date(raw: &str, line: usize, column: &str) -> Result<NaiveDate, TableError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| TableError::ParseFailed {
        line,
        message: format!("column '{column}': {e}"),
    })
}

fn parse_timestamp(raw: &str, line: usize, column: &str) -> Result<NaiveDateTime, TableError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        TableError::ParseFailed {
            line,
            message: format!("column '{column}': {e}"),
        }
    })
}

/// Split a data file into (1-based line number, row) pairs, checking the
/// header.
fn data_rows<'a>(contents: &'a str, header: &str) -> Result<Vec<(usize, &'a str)>, TableError> {
    let mut lines = contents.lines().enumerate();
    match lines.next() {
        Some((_, first)) if first.trim() == header => {}
        Some((_, first)) => {
            return Err(TableError::ParseFailed {
                line: 1,
                message: format!("unexpected header '{}'", first.trim()),
            })
        }
        None => return Ok(Vec::new()),
    }
    Ok(lines
        .map(|(idx, row)| (idx + 1, row))
        .filter(|(_, row)| !row.trim().is_empty())
        .collect())
}

fn columns<'a>(
    row: &'a str,
    line: usize,
    expected: usize,
) -> Result<Vec<&'a str>, TableError> {
    let fields: Vec<&str> = row.split(',').collect();
    if fields.len() != expected {
        return Err(TableError::ParseFailed {
            line,
            message: format!("expected {expected} columns, found {}", fields.len()),
        });
    }
    Ok(fields)
}

/// Write the marine heatwave event table.
///
/// # Errors
/// Returns `TableError::WriteFailed` if the file cannot be written.
pub fn write_mhw_table<P: AsRef<Path>>(path: P, events: &[MhwEvent]) -> Result<(), TableError> {
    let mut out = String::from(MHW_HEADER);
    out.push('\n');
    for event in events {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            event.cell.lat(),
            event.cell.lon(),
            event.start,
            event.end,
            event.duration_days,
            event.peak_intensity,
            event.mean_intensity,
            event.cumulative_intensity,
        );
    }
    fs::write(path, out).map_err(|e| TableError::WriteFailed(e.to_string()))
}

/// Load a marine heatwave event table.
///
/// # Errors
/// Returns `TableError::ReadFailed` if the file cannot be read and
/// `TableError::ParseFailed` for schema violations.
pub fn read_mhw_table<P: AsRef<Path>>(path: P) -> Result<Vec<MhwEvent>, TableError> {
    let contents = fs::read_to_string(path).map_err(|e| TableError::ReadFailed(e.to_string()))?;

    let mut events = Vec::new();
    for (line, row) in data_rows(&contents, MHW_HEADER)? {
        let cols = columns(row, line, 8)?;
        events.push(MhwEvent {
            cell: GridCell::from_degrees(
                parse_field(cols[0], line, "lat")?,
                parse_field(cols[1], line, "lon")?,
            ),
            start: parse_date(cols[2], line, "date_start")?,
            end: parse_date(cols[3], line, "date_end")?,
            duration_days: parse_field(cols[4], line, "duration")?,
            peak_intensity: parse_field(cols[5], line, "intensity_max")?,
            mean_intensity: parse_field(cols[6], line, "intensity_mean")?,
            cumulative_intensity: parse_field(cols[7], line, "intensity_cumulative")?,
        });
    }
    Ok(events)
}

/// Write the rapid intensification event table.
///
/// # Errors
/// Returns `TableError::WriteFailed` if the file cannot be written.
pub fn write_ri_table<P: AsRef<Path>>(path: P, events: &[RiEvent]) -> Result<(), TableError> {
    let mut out = String::from(RI_HEADER);
    out.push('\n');
    for event in events {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            event.storm_id,
            event.storm_name,
            event.onset.format(TIMESTAMP_FORMAT),
            event.onset_lat,
            event.onset_lon,
            event.end.format(TIMESTAMP_FORMAT),
            event.start_wind_kt,
            event.end_wind_kt,
            event.wind_change_kt,
            event.duration_hours,
            event.category_reached,
        );
    }
    fs::write(path, out).map_err(|e| TableError::WriteFailed(e.to_string()))
}

/// Load a rapid intensification event table.
///
/// # Errors
/// Returns `TableError::ReadFailed` if the file cannot be read and
/// `TableError::ParseFailed` for schema violations.
pub fn read_ri_table<P: AsRef<Path>>(path: P) -> Result<Vec<RiEvent>, TableError> {
    let contents = fs::read_to_string(path).map_err(|e| TableError::ReadFailed(e.to_string()))?;

    let mut events = Vec::new();
    for (line, row) in data_rows(&contents, RI_HEADER)? {
        let cols = columns(row, line, 11)?;
        events.push(RiEvent {
            storm_id: cols[0].trim().to_string(),
            storm_name: cols[1].trim().to_string(),
            onset: parse_timestamp(cols[2], line, "onset_time")?,
            onset_lat: parse_field(cols[3], line, "onset_lat")?,
            onset_lon: parse_field(cols[4], line, "onset_lon")?,
            end: parse_timestamp(cols[5], line, "end_time")?,
            start_wind_kt: parse_field(cols[6], line, "start_wind_kt")?,
            end_wind_kt: parse_field(cols[7], line, "end_wind_kt")?,
            wind_change_kt: parse_field(cols[8], line, "wind_change_kt")?,
            duration_hours: parse_field(cols[9], line, "duration_hours")?,
            category_reached: parse_field::<StormCategory>(cols[10], line, "category")?,
        });
    }
    Ok(events)
}

/// Write the compound pair table.
///
/// # Errors
/// Returns `TableError::WriteFailed` if the file cannot be written.
pub fn write_compound_table<P: AsRef<Path>>(
    path: P,
    pairs: &[CompoundPair],
) -> Result<(), TableError> {
    let mut out = String::from(COMPOUND_HEADER);
    out.push('\n');
    for pair in pairs {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            pair.mhw_index, pair.ri_index, pair.distance_km, pair.lag_days,
        );
    }
    fs::write(path, out).map_err(|e| TableError::WriteFailed(e.to_string()))
}

/// Load a compound pair table.
///
/// # Errors
/// Returns `TableError::ReadFailed` if the file cannot be read and
/// `TableError::ParseFailed` for schema violations.
pub fn read_compound_table<P: AsRef<Path>>(path: P) -> Result<Vec<CompoundPair>, TableError> {
    let contents = fs::read_to_string(path).map_err(|e| TableError::ReadFailed(e.to_string()))?;

    let mut pairs = Vec::new();
    for (line, row) in data_rows(&contents, COMPOUND_HEADER)? {
        let cols = columns(row, line, 4)?;
        pairs.push(CompoundPair {
            mhw_index: parse_field(cols[0], line, "mhw_index")?,
            ri_index: parse_field(cols[1], line, "ri_index")?,
            distance_km: parse_field(cols[2], line, "distance_km")?,
            lag_days: parse_field(cols[3], line, "lag_days")?,
        });
    }
    Ok(pairs)
}

/// Persist the probability summary as pretty-printed JSON.
///
/// # Errors
/// Returns `TableError::WriteFailed` if serialization or the write fails.
pub fn write_stats_json<P: AsRef<Path>>(path: P, stats: &CompoundStats) -> Result<(), TableError> {
    let contents = serde_json::to_string_pretty(stats)
        .map_err(|e| TableError::WriteFailed(e.to_string()))?;
    fs::write(path, contents).map_err(|e| TableError::WriteFailed(e.to_string()))
}
