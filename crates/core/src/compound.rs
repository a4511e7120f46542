//! Spatiotemporal matching of marine heatwaves to rapid-intensification
//! episodes, and the probability summary built on the matches.
//!
//! A pair is compound when the RI onset lies within `max_distance_km` of
//! the MHW's grid cell (great-circle) and its onset date falls inside the
//! MHW's active range widened by `max_lag_days` on both sides. All bounds
//! are inclusive. Every valid pair is retained; nothing is deduplicated by
//! storm, so one RI episode can pair with many nearby cells and one MHW
//! with many episodes.
//!
//! # Scientific References
//! - Radfar, S., Moftakhari, H. & Moradkhani, H. (2024). "Rapid
//!   intensification of tropical cyclones in the Gulf of Mexico is more
//!   likely during marine heatwaves". Communications Earth & Environment,
//!   5, 421 (200 km / 10 day proximity criteria)

use crate::core_types::events::{CompoundPair, MhwEvent, RiEvent};
use crate::core_types::geo::haversine_km;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Proximity criteria for compounding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Maximum great-circle distance from MHW cell to RI onset (km).
    pub max_distance_km: f64,
    /// Maximum days between the MHW's active range and the RI onset.
    pub max_lag_days: i64,
}

impl Default for MatchConfig {
    /// The study's 200 km / 10 day criteria.
    fn default() -> Self {
        MatchConfig {
            max_distance_km: 200.0,
            max_lag_days: 10,
        }
    }
}

/// Errors from the matcher and its statistics.
#[derive(Debug)]
pub enum MatchError {
    /// One input table is empty, making the result degenerate.
    EmptyInput { side: &'static str },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::EmptyInput { side } => {
                write!(f, "empty input: no {side} events to match")
            }
        }
    }
}

impl std::error::Error for MatchError {}

/// Signed lag in days from an MHW's active range to an RI onset date:
/// 0 while the MHW is active, positive after its end, negative before its
/// start.
fn lag_days(mhw: &MhwEvent, onset: chrono::NaiveDate) -> i64 {
    if onset < mhw.start {
        (onset - mhw.start).num_days()
    } else if onset > mhw.end {
        (onset - mhw.end).num_days()
    } else {
        0
    }
}

/// Find all compound MHW/RI pairs under the proximity criteria.
///
/// Pairs reference events by index into the input slices and are returned
/// sorted by RI index, then MHW index.
///
/// # Errors
/// Returns `MatchError::EmptyInput` when either slice is empty.
pub fn match_events(
    mhw_events: &[MhwEvent],
    ri_events: &[RiEvent],
    config: &MatchConfig,
) -> Result<Vec<CompoundPair>, MatchError> {
    if mhw_events.is_empty() {
        return Err(MatchError::EmptyInput {
            side: "marine heatwave",
        });
    }
    if ri_events.is_empty() {
        return Err(MatchError::EmptyInput {
            side: "rapid intensification",
        });
    }

    let mut pairs = Vec::new();
    for (ri_index, ri) in ri_events.iter().enumerate() {
        let onset_date = ri.onset.date();
        for (mhw_index, mhw) in mhw_events.iter().enumerate() {
            let distance_km = haversine_km(
                mhw.cell.lat(),
                mhw.cell.lon(),
                ri.onset_lat,
                ri.onset_lon,
            );
            if distance_km > config.max_distance_km {
                continue;
            }
            let lag = lag_days(mhw, onset_date);
            if lag.abs() > config.max_lag_days {
                continue;
            }
            pairs.push(CompoundPair {
                mhw_index,
                ri_index,
                distance_km,
                lag_days: lag,
            });
        }
    }

    debug!(pairs = pairs.len(), "compound matching complete");
    Ok(pairs)
}

/// Per-RI-event "was this episode MHW-compounded" booleans.
pub fn compounded_flags(pairs: &[CompoundPair], ri_count: usize) -> Vec<bool> {
    let mut flags = vec![false; ri_count];
    for pair in pairs {
        if pair.ri_index < ri_count {
            flags[pair.ri_index] = true;
        }
    }
    flags
}

/// Probability summary of a matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundStats {
    pub mhw_count: usize,
    pub ri_count: usize,
    /// RI episodes with at least one compound match.
    pub compounded_ri_count: usize,
    /// Compounded RI episodes per MHW event.
    pub p_ri_given_mhw: f64,
    /// Unconditional RI rate over the same domain and period.
    pub p_ri: f64,
    /// `p_ri_given_mhw / p_ri`: how much more likely RI is during MHWs.
    pub multiplication_rate: f64,
}

/// Compute the conditional probability summary from a matching run.
///
/// `p_ri` is the unconditional baseline (see `ri::storm_ri_rate`), supplied
/// by the caller because it depends on data the matcher never sees.
///
/// # Errors
/// Returns `MatchError::EmptyInput` when a count is zero or the baseline is
/// not a positive probability; the statistic is degenerate in either case.
pub fn compound_statistics(
    pairs: &[CompoundPair],
    mhw_count: usize,
    ri_count: usize,
    p_ri: f64,
) -> Result<CompoundStats, MatchError> {
    if mhw_count == 0 {
        return Err(MatchError::EmptyInput {
            side: "marine heatwave",
        });
    }
    if ri_count == 0 {
        return Err(MatchError::EmptyInput {
            side: "rapid intensification",
        });
    }
    if !(p_ri > 0.0 && p_ri <= 1.0) {
        return Err(MatchError::EmptyInput {
            side: "unconditional baseline",
        });
    }

    let compounded_ri_count = compounded_flags(pairs, ri_count)
        .iter()
        .filter(|&&flag| flag)
        .count();
    let p_ri_given_mhw = compounded_ri_count as f64 / mhw_count as f64;

    Ok(CompoundStats {
        mhw_count,
        ri_count,
        compounded_ri_count,
        p_ri_given_mhw,
        p_ri,
        multiplication_rate: p_ri_given_mhw / p_ri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::events::StormCategory;
    use crate::core_types::grid::GridCell;
    use chrono::{NaiveDate, NaiveDateTime};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    fn datetime(m: u32, d: u32) -> NaiveDateTime {
        date(m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    fn mhw(lat: f64, lon: f64, start: NaiveDate, end: NaiveDate) -> MhwEvent {
        MhwEvent {
            cell: GridCell::from_degrees(lat, lon),
            start,
            end,
            duration_days: ((end - start).num_days() + 1) as u32,
            peak_intensity: 2.0,
            mean_intensity: 1.5,
            cumulative_intensity: 15.0,
        }
    }

    fn ri(lat: f64, lon: f64, onset: NaiveDateTime) -> RiEvent {
        RiEvent {
            storm_id: "AL092020".to_string(),
            storm_name: "TEST".to_string(),
            onset,
            onset_lat: lat,
            onset_lon: lon,
            end: onset + chrono::Duration::hours(24),
            start_wind_kt: 60.0,
            end_wind_kt: 95.0,
            wind_change_kt: 35.0,
            duration_hours: 24.0,
            category_reached: StormCategory::Category2,
        }
    }

    #[test]
    fn test_nearby_concurrent_events_match() {
        let mhws = vec![mhw(25.0, -90.0, date(6, 1), date(6, 15))];
        let ris = vec![ri(25.3, -90.2, datetime(6, 10))];
        let pairs = match_events(&mhws, &ris, &MatchConfig::default()).unwrap();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].mhw_index, 0);
        assert_eq!(pairs[0].ri_index, 0);
        assert_eq!(pairs[0].lag_days, 0);
        assert!(pairs[0].distance_km < 50.0);
    }

    #[test]
    fn test_distance_boundary_inclusive() {
        let mhws = vec![mhw(25.0, -90.0, date(6, 1), date(6, 15))];
        let ris = vec![ri(26.5, -90.0, datetime(6, 10))];

        // Pin the limit to the exact separation: on the boundary is included
        let separation = haversine_km(25.0, -90.0, 26.5, -90.0);
        let config = MatchConfig {
            max_distance_km: separation,
            max_lag_days: 10,
        };
        let pairs = match_events(&mhws, &ris, &config).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].distance_km - separation).abs() < 1e-9);

        // Any tighter limit excludes the pair
        let config = MatchConfig {
            max_distance_km: separation - 0.001,
            max_lag_days: 10,
        };
        let pairs = match_events(&mhws, &ris, &config).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_lag_boundary_inclusive() {
        let mhws = vec![mhw(25.0, -90.0, date(6, 1), date(6, 15))];

        // Onset exactly max_lag_days after the MHW end is included
        let ris = vec![ri(25.0, -90.0, datetime(6, 25))];
        let pairs = match_events(&mhws, &ris, &MatchConfig::default()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].lag_days, 10);

        // One day beyond is excluded
        let ris = vec![ri(25.0, -90.0, datetime(6, 26))];
        let pairs = match_events(&mhws, &ris, &MatchConfig::default()).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_onset_during_long_heatwave_matches() {
        // Onset deep inside a 60-day MHW, more than max_lag from both ends
        let mhws = vec![mhw(25.0, -90.0, date(5, 1), date(6, 30))];
        let ris = vec![ri(25.0, -90.0, datetime(6, 1))];
        let pairs = match_events(&mhws, &ris, &MatchConfig::default()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].lag_days, 0);
    }

    #[test]
    fn test_onset_before_start_has_negative_lag() {
        let mhws = vec![mhw(25.0, -90.0, date(6, 10), date(6, 20))];
        let ris = vec![ri(25.0, -90.0, datetime(6, 5))];
        let pairs = match_events(&mhws, &ris, &MatchConfig::default()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].lag_days, -5);
    }

    #[test]
    fn test_multiplicity_is_preserved() {
        // Two nearby cells, two episodes: all four pairs are retained
        let mhws = vec![
            mhw(25.0, -90.0, date(6, 1), date(6, 15)),
            mhw(25.5, -90.0, date(6, 1), date(6, 15)),
        ];
        let ris = vec![
            ri(25.2, -90.0, datetime(6, 5)),
            ri(25.3, -90.0, datetime(6, 12)),
        ];
        let pairs = match_events(&mhws, &ris, &MatchConfig::default()).unwrap();
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let mhws = vec![mhw(25.0, -90.0, date(6, 1), date(6, 15))];
        let ris = vec![ri(25.0, -90.0, datetime(6, 10))];

        assert!(matches!(
            match_events(&[], &ris, &MatchConfig::default()),
            Err(MatchError::EmptyInput { .. })
        ));
        assert!(matches!(
            match_events(&mhws, &[], &MatchConfig::default()),
            Err(MatchError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_compounded_flags() {
        let pairs = vec![
            CompoundPair {
                mhw_index: 0,
                ri_index: 2,
                distance_km: 10.0,
                lag_days: 0,
            },
            CompoundPair {
                mhw_index: 1,
                ri_index: 2,
                distance_km: 30.0,
                lag_days: 3,
            },
        ];
        assert_eq!(compounded_flags(&pairs, 4), vec![false, false, true, false]);
    }

    #[test]
    fn test_statistics_multiplication_rate() {
        let pairs = vec![
            CompoundPair {
                mhw_index: 0,
                ri_index: 0,
                distance_km: 10.0,
                lag_days: 0,
            },
            CompoundPair {
                mhw_index: 1,
                ri_index: 1,
                distance_km: 20.0,
                lag_days: 2,
            },
        ];
        let stats = compound_statistics(&pairs, 10, 4, 0.05).unwrap();
        assert_eq!(stats.compounded_ri_count, 2);
        assert!((stats.p_ri_given_mhw - 0.2).abs() < 1e-12);
        assert!((stats.multiplication_rate - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_statistics_rejected() {
        assert!(compound_statistics(&[], 0, 5, 0.1).is_err());
        assert!(compound_statistics(&[], 5, 0, 0.1).is_err());
        assert!(compound_statistics(&[], 5, 5, 0.0).is_err());
    }
}
