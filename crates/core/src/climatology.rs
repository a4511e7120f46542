//! Seasonal climatology and percentile threshold construction.
//!
//! Implements the marine heatwave baseline of Hobday et al. (2016): for each
//! day of year, the seasonal climatology is the mean of all observations
//! falling within a centered window across the reference years, and the
//! threshold is a high percentile of the same pooled values. Both curves are
//! then smoothed with a circular moving average to remove day-to-day noise.
//!
//! Day-of-year handling uses 365 bins; **Feb 29 folds into Feb 28's bin**,
//! and later days of a leap year shift back by one. The same convention is
//! applied when the finished climatology is looked up, so leap years are
//! consistent between construction and detection.
//!
//! # Scientific References
//! - Hobday, A.J. et al. (2016). "A hierarchical approach to defining marine
//!   heatwaves". Progress in Oceanography, 141, 227-238
//! - Radfar, S., Moftakhari, H. & Moradkhani, H. (2024). "Rapid
//!   intensification of tropical cyclones in the Gulf of Mexico is more
//!   likely during marine heatwaves". Communications Earth & Environment, 5, 421

use crate::core_types::series::{DateRange, SstSeries};
use chrono::{Datelike, NaiveDate};

/// Number of day-of-year bins; Feb 29 shares Feb 28's bin.
pub const DOY_BINS: usize = 365;

/// Map a calendar date to its day-of-year bin in `0..DOY_BINS`.
///
/// In leap years the fold shifts Mar 1 and later back by one so every
/// calendar day lands on the same bin each year.
pub fn doy_index(date: NaiveDate) -> usize {
    let ordinal0 = date.ordinal0() as usize;
    if date.leap_year() && ordinal0 >= 59 {
        // ordinal0 59 is Feb 29; fold onto Feb 28 (bin 58) and close the gap
        ordinal0 - 1
    } else {
        ordinal0
    }
}

/// Per-cell seasonal baseline: one smoothed mean and one smoothed threshold
/// value per day-of-year bin.
///
/// Built once per grid cell by the detection run and discarded after the
/// event table is produced. Bins with no usable observation hold NaN; a NaN
/// threshold can never be exceeded.
#[derive(Debug, Clone)]
pub struct Climatology {
    seasonal: Vec<f64>,
    threshold: Vec<f64>,
}

impl Climatology {
    /// Construct the climatology for one series over a reference period.
    ///
    /// Every finite observation inside `period` contributes to all bins
    /// within `half_window` days of its own (wrapping across the year
    /// boundary), pooling the windows across years. Each bin's mean becomes
    /// the raw seasonal value and its linearly interpolated `percentile`
    /// becomes the raw threshold; both curves are then smoothed with a
    /// circular moving average `smooth_window` days wide.
    ///
    /// Callers are expected to have validated `percentile` and the period;
    /// see `DetectionConfig::validate`.
    pub fn build(
        series: &SstSeries,
        period: &DateRange,
        percentile: f64,
        half_window: u32,
        smooth_window: u32,
    ) -> Self {
        let mut samples: Vec<Vec<f64>> = vec![Vec::new(); DOY_BINS];

        let half = half_window as usize;
        for (date, value) in series.iter_days() {
            if !period.contains(date) || !value.is_finite() {
                continue;
            }
            let bin = doy_index(date);
            for offset in 0..=(2 * half) {
                let target = (bin + DOY_BINS + offset - half) % DOY_BINS;
                samples[target].push(value);
            }
        }

        let mut raw_seasonal = vec![f64::NAN; DOY_BINS];
        let mut raw_threshold = vec![f64::NAN; DOY_BINS];
        for (bin, pool) in samples.iter_mut().enumerate() {
            if pool.is_empty() {
                continue;
            }
            let sum: f64 = pool.iter().sum();
            raw_seasonal[bin] = sum / pool.len() as f64;
            pool.sort_by(f64::total_cmp);
            raw_threshold[bin] = percentile_sorted(pool, percentile);
        }

        Climatology {
            seasonal: circular_moving_average(&raw_seasonal, smooth_window),
            threshold: circular_moving_average(&raw_threshold, smooth_window),
        }
    }

    /// A climatology with the same mean and threshold on every day of year.
    ///
    /// Used for controlled detection tests and sensitivity runs where the
    /// seasonal cycle is deliberately flattened.
    pub fn uniform(seasonal: f64, threshold: f64) -> Self {
        Climatology {
            seasonal: vec![seasonal; DOY_BINS],
            threshold: vec![threshold; DOY_BINS],
        }
    }

    /// Smoothed climatological mean for `date`'s day of year.
    pub fn seasonal_on(&self, date: NaiveDate) -> f64 {
        self.seasonal[doy_index(date)]
    }

    /// Smoothed percentile threshold for `date`'s day of year.
    pub fn threshold_on(&self, date: NaiveDate) -> f64 {
        self.threshold[doy_index(date)]
    }
}

/// Linearly interpolated percentile of an ascending-sorted slice.
///
/// Matches the conventional definition: rank h = (n-1) × p/100, value
/// interpolated between the flanking order statistics. Returns NaN for an
/// empty slice.
fn percentile_sorted(sorted: &[f64], percentile: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (sorted.len() - 1) as f64 * percentile / 100.0;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Moving average over a circular (day-of-year) array, ignoring NaN bins.
///
/// `window` is the full width in days; even widths round up to the next odd
/// width so the window stays centered. Bins whose window holds no finite
/// value stay NaN.
fn circular_moving_average(values: &[f64], window: u32) -> Vec<f64> {
    let n = values.len();
    let half = (window as usize) / 2;

    let mut smoothed = vec![f64::NAN; n];
    for center in 0..n {
        let mut sum = 0.0;
        let mut count = 0usize;
        for offset in 0..=(2 * half) {
            let idx = (center + n + offset - half) % n;
            if values[idx].is_finite() {
                sum += values[idx];
                count += 1;
            }
        }
        if count > 0 {
            smoothed[center] = sum / count as f64;
        }
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::grid::GridCell;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cell() -> GridCell {
        GridCell::from_degrees(25.0, -90.0)
    }

    #[test]
    fn test_leap_day_folds_onto_feb_28() {
        assert_eq!(doy_index(date(2020, 2, 28)), doy_index(date(2020, 2, 29)));
        // Same calendar day maps to the same bin in leap and non-leap years
        assert_eq!(doy_index(date(2020, 3, 1)), doy_index(date(2019, 3, 1)));
        assert_eq!(doy_index(date(2020, 12, 31)), doy_index(date(2019, 12, 31)));
        assert_eq!(doy_index(date(2019, 12, 31)), DOY_BINS - 1);
    }

    #[test]
    fn test_percentile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile_sorted(&values, 50.0), 2.5);
        assert_relative_eq!(percentile_sorted(&values, 90.0), 3.7, epsilon = 1e-12);
        assert_relative_eq!(percentile_sorted(&values, 0.0), 1.0);
        assert_relative_eq!(percentile_sorted(&values, 100.0), 4.0);
        assert!(percentile_sorted(&[], 90.0).is_nan());
    }

    #[test]
    fn test_moving_average_wraps_year_boundary() {
        let mut values = vec![0.0; DOY_BINS];
        values[0] = 365.0;
        let smoothed = circular_moving_average(&values, 31);
        // The spike spreads into the last bins of the year
        assert_relative_eq!(smoothed[DOY_BINS - 1], 365.0 / 31.0, epsilon = 1e-9);
        assert_relative_eq!(smoothed[15], 365.0 / 31.0, epsilon = 1e-9);
        assert_relative_eq!(smoothed[16], 0.0);
    }

    #[test]
    fn test_constant_series_yields_constant_baseline() {
        let start = date(2015, 1, 1);
        let days = (date(2017, 12, 31) - start).num_days() as usize + 1;
        let series = SstSeries::new(cell(), start, vec![28.0; days]);
        let period = DateRange::new(start, date(2017, 12, 31));

        let clim = Climatology::build(&series, &period, 90.0, 5, 31);
        for probe in [date(2018, 1, 1), date(2018, 7, 15), date(2018, 12, 31)] {
            assert_relative_eq!(clim.seasonal_on(probe), 28.0, epsilon = 1e-9);
            assert_relative_eq!(clim.threshold_on(probe), 28.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_threshold_sits_above_mean_for_variable_data() {
        // Alternate cool and warm days so every bin pools both values
        let start = date(2015, 1, 1);
        let days = (date(2017, 12, 31) - start).num_days() as usize + 1;
        let values: Vec<f64> = (0..days)
            .map(|i| if i % 2 == 0 { 24.0 } else { 26.0 })
            .collect();
        let series = SstSeries::new(cell(), start, values);
        let period = DateRange::new(start, date(2017, 12, 31));

        let clim = Climatology::build(&series, &period, 90.0, 5, 31);
        let probe = date(2016, 6, 1);
        assert!(clim.threshold_on(probe) > clim.seasonal_on(probe));
        assert!(clim.threshold_on(probe) <= 26.0);
    }

    #[test]
    fn test_missing_days_are_excluded_from_bins() {
        let start = date(2015, 1, 1);
        let days = (date(2017, 12, 31) - start).num_days() as usize + 1;
        let mut values = vec![28.0; days];
        // Punch NaN holes; the baseline must be unaffected
        for idx in (0..days).step_by(7) {
            values[idx] = f64::NAN;
        }
        let series = SstSeries::new(cell(), start, values);
        let period = DateRange::new(start, date(2017, 12, 31));

        let clim = Climatology::build(&series, &period, 90.0, 5, 31);
        assert_relative_eq!(clim.seasonal_on(date(2016, 8, 1)), 28.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uniform_lookup() {
        let clim = Climatology::uniform(28.0, 29.0);
        assert_eq!(clim.seasonal_on(date(2020, 2, 29)), 28.0);
        assert_eq!(clim.threshold_on(date(2021, 7, 4)), 29.0);
    }
}
