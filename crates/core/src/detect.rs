//! Marine heatwave event detection for a single grid cell.
//!
//! A day belongs to a heatwave candidate when its observed SST strictly
//! exceeds the day-of-year threshold. Maximal exceeding runs are merged
//! across short below-threshold gaps, filtered by minimum duration, and
//! summarized into immutable `MhwEvent` records.
//!
//! Gap days absorbed by merging count toward an event's duration but are
//! excluded from its intensity statistics; peak, mean and cumulative
//! intensity are computed over exceeding days only, relative to the
//! smoothed climatological mean.

use crate::climatology::Climatology;
use crate::core_types::events::MhwEvent;
use crate::core_types::grid::GridCell;
use crate::core_types::series::{DateRange, SstSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Parameters of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Threshold percentile, strictly between 0 and 100.
    pub percentile: f64,
    /// Reference period the climatology is built over.
    pub climatology_period: DateRange,
    /// Minimum event duration in days (Hobday et al. use 5).
    pub min_duration: u32,
    /// Maximum below-threshold gap bridged by merging (Hobday et al. use 2).
    pub max_gap: u32,
    /// Half-width of the day-of-year sampling window in days.
    pub window_half_width: u32,
    /// Full width of the climatology smoothing window in days.
    pub smooth_window: u32,
}

impl DetectionConfig {
    /// Conventional marine heatwave parameters over `climatology_period`:
    /// 90th percentile, 5-day minimum duration, 2-day gap merging, ±5-day
    /// sampling window, 31-day smoothing.
    pub fn new(climatology_period: DateRange) -> Self {
        DetectionConfig {
            percentile: 90.0,
            climatology_period,
            min_duration: 5,
            max_gap: 2,
            window_half_width: 5,
            smooth_window: 31,
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    /// Returns `DetectError::InvalidParameter` naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<(), DetectError> {
        if !self.percentile.is_finite() || self.percentile <= 0.0 || self.percentile >= 100.0 {
            return Err(DetectError::InvalidParameter {
                name: "percentile",
                message: format!(
                    "must be strictly between 0 and 100, got {}",
                    self.percentile
                ),
            });
        }
        if self.min_duration < 1 {
            return Err(DetectError::InvalidParameter {
                name: "min_duration",
                message: format!("must be at least 1 day, got {}", self.min_duration),
            });
        }
        if self.smooth_window < 1 {
            return Err(DetectError::InvalidParameter {
                name: "smooth_window",
                message: format!("must be at least 1 day, got {}", self.smooth_window),
            });
        }
        if self.climatology_period.start > self.climatology_period.end {
            return Err(DetectError::InvalidParameter {
                name: "climatology_period",
                message: format!(
                    "start {} is after end {}",
                    self.climatology_period.start, self.climatology_period.end
                ),
            });
        }
        Ok(())
    }
}

/// Errors from a single-cell detection run.
#[derive(Debug)]
pub enum DetectError {
    /// A detection parameter is out of range.
    InvalidParameter {
        name: &'static str,
        message: String,
    },
    /// The cell's series cannot support a climatology.
    InsufficientData { cell: GridCell, message: String },
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            DetectError::InsufficientData { cell, message } => {
                write!(f, "insufficient data for cell {cell}: {message}")
            }
        }
    }
}

impl std::error::Error for DetectError {}

/// Detect marine heatwaves in one grid cell's series.
///
/// Builds the cell's climatology over `config.climatology_period`, then
/// walks the full series (including years outside the reference period)
/// looking for threshold exceedance. Returned events are non-overlapping
/// and sorted by start date.
///
/// # Errors
/// - `DetectError::InvalidParameter` for out-of-range configuration
/// - `DetectError::InsufficientData` when the series does not cover the
///   climatology period or holds no finite observation inside it
pub fn detect_events(
    series: &SstSeries,
    config: &DetectionConfig,
) -> Result<Vec<MhwEvent>, DetectError> {
    config.validate()?;

    if !series.covers(&config.climatology_period) {
        return Err(DetectError::InsufficientData {
            cell: series.cell(),
            message: format!(
                "series spans {}..{} but the climatology period is {}..{}",
                series.start(),
                series.end(),
                config.climatology_period.start,
                config.climatology_period.end
            ),
        });
    }
    let usable = series
        .iter_days()
        .filter(|(date, value)| config.climatology_period.contains(*date) && value.is_finite())
        .count();
    if usable == 0 {
        return Err(DetectError::InsufficientData {
            cell: series.cell(),
            message: "no finite observation inside the climatology period".to_string(),
        });
    }

    let climatology = Climatology::build(
        series,
        &config.climatology_period,
        config.percentile,
        config.window_half_width,
        config.smooth_window,
    );
    detect_with_climatology(series, &climatology, config)
}

/// Detect marine heatwaves against a prebuilt climatology.
///
/// Lower-level entry point used by `detect_events` and by controlled runs
/// with a `Climatology::uniform` baseline.
///
/// # Errors
/// Returns `DetectError::InvalidParameter` for out-of-range configuration.
pub fn detect_with_climatology(
    series: &SstSeries,
    climatology: &Climatology,
    config: &DetectionConfig,
) -> Result<Vec<MhwEvent>, DetectError> {
    config.validate()?;

    let exceeding: Vec<bool> = series
        .iter_days()
        .map(|(date, value)| {
            let threshold = climatology.threshold_on(date);
            value.is_finite() && threshold.is_finite() && value > threshold
        })
        .collect();

    let runs = exceeding_runs(&exceeding);
    let merged = merge_runs(&runs, config.max_gap as usize);

    let mut events = Vec::new();
    for (start_idx, end_idx) in merged {
        let duration = (end_idx - start_idx + 1) as u32;
        if duration < config.min_duration {
            continue;
        }
        events.push(summarize_event(
            series,
            climatology,
            &exceeding,
            start_idx,
            end_idx,
            duration,
        ));
    }

    debug!(
        cell = %series.cell(),
        events = events.len(),
        "detection complete"
    );
    Ok(events)
}

/// Maximal runs of exceeding days as inclusive `(start, end)` index pairs.
fn exceeding_runs(exceeding: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut run_start = None;
    for (idx, &hot) in exceeding.iter().enumerate() {
        match (hot, run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                runs.push((start, idx - 1));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push((start, exceeding.len() - 1));
    }
    runs
}

/// Merge consecutive runs separated by at most `max_gap` non-exceeding days.
fn merge_runs(runs: &[(usize, usize)], max_gap: usize) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(runs.len());
    for &(start, end) in runs {
        match merged.last_mut() {
            Some((_, prev_end)) if start - *prev_end - 1 <= max_gap => *prev_end = end,
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Compute event metrics over the exceeding days of `[start_idx, end_idx]`.
fn summarize_event(
    series: &SstSeries,
    climatology: &Climatology,
    exceeding: &[bool],
    start_idx: usize,
    end_idx: usize,
    duration: u32,
) -> MhwEvent {
    let mut peak = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    for idx in start_idx..=end_idx {
        if !exceeding[idx] {
            continue;
        }
        let date = series.date_at(idx);
        let anomaly = series.value_at(idx) - climatology.seasonal_on(date);
        peak = peak.max(anomaly);
        sum += anomaly;
        count += 1;
    }

    MhwEvent {
        cell: series.cell(),
        start: series.date_at(start_idx),
        end: series.date_at(end_idx),
        duration_days: duration,
        peak_intensity: peak,
        mean_intensity: sum / count as f64,
        cumulative_intensity: sum,
    }
}
