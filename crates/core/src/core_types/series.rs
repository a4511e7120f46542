//! Daily sea-surface temperature series for a single grid cell.

use crate::core_types::grid::GridCell;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Whether `date` falls inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days spanned, counting both endpoints.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// One grid cell's daily SST record.
///
/// Values are stored densely, one per calendar day from `start`; days with
/// no observation hold `f64::NAN`. Missing data propagates as NaN and is
/// never interpolated: NaN days cannot exceed a threshold and never enter
/// climatology bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SstSeries {
    cell: GridCell,
    start: NaiveDate,
    values: Vec<f64>,
}

impl SstSeries {
    /// Build a series from a dense daily value vector starting at `start`.
    pub fn new(cell: GridCell, start: NaiveDate, values: Vec<f64>) -> Self {
        SstSeries {
            cell,
            start,
            values,
        }
    }

    /// Build a series from unordered `(date, sst)` observations.
    ///
    /// Observations are sorted, duplicate dates keep the last value, and
    /// days without an observation are filled with NaN. Returns `None` for
    /// an empty observation list.
    pub fn from_observations(cell: GridCell, mut obs: Vec<(NaiveDate, f64)>) -> Option<Self> {
        if obs.is_empty() {
            return None;
        }
        obs.sort_by_key(|(date, _)| *date);

        let start = obs[0].0;
        let end = obs[obs.len() - 1].0;
        let len = (end - start).num_days() as usize + 1;

        let mut values = vec![f64::NAN; len];
        for (date, sst) in obs {
            let idx = (date - start).num_days() as usize;
            values[idx] = sst;
        }

        Some(SstSeries {
            cell,
            start,
            values,
        })
    }

    pub fn cell(&self) -> GridCell {
        self.cell
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Date of the last stored day.
    pub fn end(&self) -> NaiveDate {
        self.date_at(self.values.len().saturating_sub(1))
    }

    /// Number of stored days.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Calendar date of day index `idx`.
    pub fn date_at(&self, idx: usize) -> NaiveDate {
        self.start + Days::new(idx as u64)
    }

    /// Value at day index `idx`.
    pub fn value_at(&self, idx: usize) -> f64 {
        self.values[idx]
    }

    /// Daily values, one per day from `start()`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Whether the stored days fully cover `range`.
    pub fn covers(&self, range: &DateRange) -> bool {
        !self.is_empty() && self.start <= range.start && self.end() >= range.end
    }

    /// Iterate `(date, value)` pairs in chronological order.
    pub fn iter_days(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(idx, &value)| (self.date_at(idx), value))
    }
}
