//! Input table loaders: gridded SST observations and best-track records.
//!
//! These are the upstream collaborators of the analysis core; data-shape
//! problems (missing columns, unparseable dates) are reported here, before
//! any series reaches the detector.

use chrono::{NaiveDate, NaiveDateTime};
use mhw_ri_core::{BestTrackPoint, GridCell, SstSeries};
use rustc_hash::FxHashMap;
use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::info;

fn bad_row(path: &Path, line: usize, message: &str) -> Box<dyn Error> {
    format!("{}:{line}: {message}", path.display()).into()
}

/// Load a `date,lat,lon,sst` table and partition it into per-cell series.
///
/// An empty SST field marks a missing observation and is kept as NaN.
/// Cells are returned sorted by coordinates so runs are reproducible.
pub fn load_sst_table(path: &Path) -> Result<Vec<SstSeries>, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header.trim() == "date,lat,lon,sst" => {}
        Some((_, header)) => {
            return Err(bad_row(
                path,
                1,
                &format!("expected header 'date,lat,lon,sst', found '{}'", header.trim()),
            ))
        }
        None => return Err(format!("{}: empty SST table", path.display()).into()),
    }

    let mut per_cell: FxHashMap<GridCell, Vec<(NaiveDate, f64)>> = FxHashMap::default();
    for (idx, row) in lines {
        let line = idx + 1;
        if row.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != 4 {
            return Err(bad_row(
                path,
                line,
                &format!("expected 4 columns, found {}", fields.len()),
            ));
        }
        let date = NaiveDate::parse_from_str(fields[0].trim(), "%Y-%m-%d")
            .map_err(|e| bad_row(path, line, &format!("column 'date': {e}")))?;
        let lat: f64 = fields[1]
            .trim()
            .parse()
            .map_err(|e| bad_row(path, line, &format!("column 'lat': {e}")))?;
        let lon: f64 = fields[2]
            .trim()
            .parse()
            .map_err(|e| bad_row(path, line, &format!("column 'lon': {e}")))?;
        let sst = if fields[3].trim().is_empty() {
            f64::NAN
        } else {
            fields[3]
                .trim()
                .parse()
                .map_err(|e| bad_row(path, line, &format!("column 'sst': {e}")))?
        };
        per_cell
            .entry(GridCell::from_degrees(lat, lon))
            .or_default()
            .push((date, sst));
    }

    let mut cells: Vec<(GridCell, Vec<(NaiveDate, f64)>)> = per_cell.into_iter().collect();
    cells.sort_by_key(|(cell, _)| *cell);

    let series_set: Vec<SstSeries> = cells
        .into_iter()
        .filter_map(|(cell, obs)| SstSeries::from_observations(cell, obs))
        .collect();
    info!(
        cells = series_set.len(),
        "loaded SST table {}",
        path.display()
    );
    Ok(series_set)
}

/// Load a `storm_id,name,time,lat,lon,wind_kt` best-track table.
///
/// An empty wind field is kept as NaN; the RI detector skips such fixes.
pub fn load_best_track(path: &Path) -> Result<Vec<BestTrackPoint>, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header.trim() == "storm_id,name,time,lat,lon,wind_kt" => {}
        Some((_, header)) => {
            return Err(bad_row(
                path,
                1,
                &format!(
                    "expected header 'storm_id,name,time,lat,lon,wind_kt', found '{}'",
                    header.trim()
                ),
            ))
        }
        None => return Err(format!("{}: empty best-track table", path.display()).into()),
    }

    let mut track = Vec::new();
    for (idx, row) in lines {
        let line = idx + 1;
        if row.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != 6 {
            return Err(bad_row(
                path,
                line,
                &format!("expected 6 columns, found {}", fields.len()),
            ));
        }
        let time = NaiveDateTime::parse_from_str(fields[2].trim(), "%Y-%m-%d %H:%M")
            .map_err(|e| bad_row(path, line, &format!("column 'time': {e}")))?;
        let lat: f64 = fields[3]
            .trim()
            .parse()
            .map_err(|e| bad_row(path, line, &format!("column 'lat': {e}")))?;
        let lon: f64 = fields[4]
            .trim()
            .parse()
            .map_err(|e| bad_row(path, line, &format!("column 'lon': {e}")))?;
        let wind_kt = if fields[5].trim().is_empty() {
            f64::NAN
        } else {
            fields[5]
                .trim()
                .parse()
                .map_err(|e| bad_row(path, line, &format!("column 'wind_kt': {e}")))?
        };
        track.push(BestTrackPoint {
            storm_id: fields[0].trim().to_string(),
            storm_name: fields[1].trim().to_string(),
            time,
            lat,
            lon,
            wind_kt,
        });
    }
    info!(
        fixes = track.len(),
        "loaded best-track table {}",
        path.display()
    );
    Ok(track)
}
