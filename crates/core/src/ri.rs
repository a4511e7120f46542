//! Rapid-intensification detection from tropical cyclone best-track records.
//!
//! An episode starts at a best-track fix whose wind is exceeded by at least
//! `threshold_kt` at some later fix of the same storm within `window_hours`.
//! The episode runs to the first such qualifying fix. Every qualifying start
//! fix yields an episode, so overlapping episodes of one storm are expected;
//! downstream probability work collapses them per storm.
//!
//! # Scientific References
//! - Kaplan, J. & DeMaria, M. (2003). "Large-scale characteristics of
//!   rapidly intensifying tropical cyclones in the North Atlantic basin".
//!   Weather and Forecasting, 18(6), 1093-1108 (the 30 kt / 24 h criterion)

use crate::core_types::events::{RiEvent, StormCategory};
use chrono::{Duration, NaiveDateTime};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One best-track fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestTrackPoint {
    pub storm_id: String,
    pub storm_name: String,
    pub time: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
    /// Maximum sustained wind in knots; NaN when not reported.
    pub wind_kt: f64,
}

/// Rapid-intensification criterion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiConfig {
    /// Minimum wind increase in knots.
    pub threshold_kt: f64,
    /// Window the increase must occur within, in hours.
    pub window_hours: i64,
}

impl Default for RiConfig {
    /// The operational 30 kt in 24 h definition.
    fn default() -> Self {
        RiConfig {
            threshold_kt: 30.0,
            window_hours: 24,
        }
    }
}

/// Detect rapid-intensification episodes over a set of best-track records.
///
/// Fixes are partitioned per storm id and sorted by time before scanning,
/// so interleaved or multi-storm tables are handled correctly. Fixes with
/// non-finite wind are ignored. Episodes are returned grouped by storm in
/// order of first appearance, sorted by onset within each storm.
pub fn detect_ri(track: &[BestTrackPoint], config: &RiConfig) -> Vec<RiEvent> {
    let window = Duration::hours(config.window_hours);

    let mut storm_order: Vec<&str> = Vec::new();
    let mut by_storm: FxHashMap<&str, Vec<&BestTrackPoint>> = FxHashMap::default();
    for point in track {
        if !point.wind_kt.is_finite() {
            continue;
        }
        by_storm
            .entry(point.storm_id.as_str())
            .or_insert_with(|| {
                storm_order.push(point.storm_id.as_str());
                Vec::new()
            })
            .push(point);
    }

    let mut events = Vec::new();
    for storm_id in storm_order {
        let mut fixes = by_storm.remove(storm_id).unwrap_or_default();
        fixes.sort_by_key(|point| point.time);

        for i in 0..fixes.len() {
            let start = fixes[i];
            for j in (i + 1)..fixes.len() {
                let elapsed = fixes[j].time - start.time;
                if elapsed > window {
                    break;
                }
                if fixes[j].wind_kt - start.wind_kt >= config.threshold_kt {
                    let peak_wind = fixes[i..=j]
                        .iter()
                        .map(|fix| fix.wind_kt)
                        .fold(f64::NEG_INFINITY, f64::max);
                    events.push(RiEvent {
                        storm_id: start.storm_id.clone(),
                        storm_name: start.storm_name.clone(),
                        onset: start.time,
                        onset_lat: start.lat,
                        onset_lon: start.lon,
                        end: fixes[j].time,
                        start_wind_kt: start.wind_kt,
                        end_wind_kt: fixes[j].wind_kt,
                        wind_change_kt: fixes[j].wind_kt - start.wind_kt,
                        duration_hours: elapsed.num_minutes() as f64 / 60.0,
                        category_reached: StormCategory::from_wind_kt(peak_wind),
                    });
                    break;
                }
            }
        }
    }

    debug!(episodes = events.len(), "rapid intensification scan complete");
    events
}

/// Fraction of distinct storms in `track` with at least one detected
/// episode: the unconditional P(RI) baseline for the multiplication rate.
///
/// Returns 0.0 when the track table is empty.
pub fn storm_ri_rate(track: &[BestTrackPoint], events: &[RiEvent]) -> f64 {
    let storms: FxHashSet<&str> = track.iter().map(|point| point.storm_id.as_str()).collect();
    if storms.is_empty() {
        return 0.0;
    }
    let intensifying: FxHashSet<&str> = events
        .iter()
        .map(|event| event.storm_id.as_str())
        .filter(|id| storms.contains(id))
        .collect();
    intensifying.len() as f64 / storms.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn time(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 8, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn fix(storm: &str, t: NaiveDateTime, wind: f64) -> BestTrackPoint {
        BestTrackPoint {
            storm_id: storm.to_string(),
            storm_name: storm.to_string(),
            time: t,
            lat: 24.0,
            lon: -88.0,
            wind_kt: wind,
        }
    }

    #[test]
    fn test_steady_storm_has_no_episode() {
        let track: Vec<_> = (0..8)
            .map(|step| fix("AL01", time(1, 0) + Duration::hours(6 * step), 50.0))
            .collect();
        assert!(detect_ri(&track, &RiConfig::default()).is_empty());
    }

    #[test]
    fn test_thirty_knots_in_a_day_qualifies() {
        let track = vec![
            fix("AL01", time(1, 0), 50.0),
            fix("AL01", time(1, 6), 60.0),
            fix("AL01", time(1, 12), 70.0),
            fix("AL01", time(1, 18), 80.0),
        ];
        let events = detect_ri(&track, &RiConfig::default());

        // Fix 0 reaches +30 kt at fix 3; later fixes have no +30 successor
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.onset, time(1, 0));
        assert_eq!(event.end, time(1, 18));
        assert_eq!(event.wind_change_kt, 30.0);
        assert_eq!(event.duration_hours, 18.0);
        assert_eq!(event.category_reached, StormCategory::Category1);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        // +30 kt exactly 24 h later qualifies
        let track = vec![fix("AL01", time(1, 0), 50.0), fix("AL01", time(2, 0), 80.0)];
        assert_eq!(detect_ri(&track, &RiConfig::default()).len(), 1);

        // +30 kt at 30 h does not
        let track = vec![fix("AL01", time(1, 0), 50.0), fix("AL01", time(2, 6), 80.0)];
        assert!(detect_ri(&track, &RiConfig::default()).is_empty());
    }

    #[test]
    fn test_storms_are_scanned_independently() {
        // Interleaved storms must not intensify across each other
        let track = vec![
            fix("AL01", time(1, 0), 50.0),
            fix("AL02", time(1, 6), 85.0),
            fix("AL01", time(1, 12), 55.0),
            fix("AL02", time(1, 18), 90.0),
        ];
        assert!(detect_ri(&track, &RiConfig::default()).is_empty());
    }

    #[test]
    fn test_missing_wind_is_skipped() {
        let track = vec![
            fix("AL01", time(1, 0), 50.0),
            fix("AL01", time(1, 6), f64::NAN),
            fix("AL01", time(1, 12), 85.0),
        ];
        let events = detect_ri(&track, &RiConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].wind_change_kt, 35.0);
    }

    #[test]
    fn test_category_uses_peak_wind_over_episode() {
        let track = vec![
            fix("AL01", time(1, 0), 60.0),
            fix("AL01", time(1, 12), 100.0),
        ];
        let events = detect_ri(&track, &RiConfig::default());
        assert_eq!(events[0].category_reached, StormCategory::Category3);
    }

    #[test]
    fn test_storm_ri_rate() {
        let track = vec![
            fix("AL01", time(1, 0), 50.0),
            fix("AL01", time(1, 12), 85.0),
            fix("AL02", time(1, 0), 40.0),
            fix("AL02", time(1, 12), 45.0),
            fix("AL03", time(1, 0), 60.0),
            fix("AL03", time(1, 12), 60.0),
            fix("AL04", time(1, 0), 30.0),
            fix("AL04", time(1, 12), 70.0),
        ];
        let events = detect_ri(&track, &RiConfig::default());
        let rate = storm_ri_rate(&track, &events);
        // AL01 and AL04 intensified out of four storms
        assert!((rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_track_rate_is_zero() {
        assert_eq!(storm_ri_rate(&[], &[]), 0.0);
    }
}
