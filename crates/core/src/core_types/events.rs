//! Detected event records: marine heatwaves, rapid intensification
//! episodes, and the compound pairs linking them.

use crate::core_types::grid::GridCell;
use crate::core_types::series::DateRange;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One detected marine heatwave at a single grid cell.
///
/// Intensities are in °C above the smoothed climatological mean
/// (`peak_intensity`, `mean_intensity`) or °C·days (`cumulative_intensity`).
/// Duration counts every day from start to end inclusive, including any
/// below-threshold gap days absorbed by gap merging; intensity statistics
/// cover exceeding days only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MhwEvent {
    pub cell: GridCell,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: u32,
    pub peak_intensity: f64,
    pub mean_intensity: f64,
    pub cumulative_intensity: f64,
}

impl MhwEvent {
    /// The dates over which the event was active (inclusive).
    pub fn active_range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

/// Saffir-Simpson category, extended downward to pre-hurricane stages.
///
/// Wind thresholds in knots: TS at 34, hurricane categories at
/// 64 / 83 / 96 / 113 / 137.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StormCategory {
    TropicalDepression,
    TropicalStorm,
    Category1,
    Category2,
    Category3,
    Category4,
    Category5,
}

impl StormCategory {
    /// Classify a maximum sustained wind speed in knots.
    pub fn from_wind_kt(wind_kt: f64) -> Self {
        if wind_kt >= 137.0 {
            StormCategory::Category5
        } else if wind_kt >= 113.0 {
            StormCategory::Category4
        } else if wind_kt >= 96.0 {
            StormCategory::Category3
        } else if wind_kt >= 83.0 {
            StormCategory::Category2
        } else if wind_kt >= 64.0 {
            StormCategory::Category1
        } else if wind_kt >= 34.0 {
            StormCategory::TropicalStorm
        } else {
            StormCategory::TropicalDepression
        }
    }
}

impl fmt::Display for StormCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StormCategory::TropicalDepression => "TD",
            StormCategory::TropicalStorm => "TS",
            StormCategory::Category1 => "Cat1",
            StormCategory::Category2 => "Cat2",
            StormCategory::Category3 => "Cat3",
            StormCategory::Category4 => "Cat4",
            StormCategory::Category5 => "Cat5",
        };
        write!(f, "{label}")
    }
}

impl FromStr for StormCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TD" => Ok(StormCategory::TropicalDepression),
            "TS" => Ok(StormCategory::TropicalStorm),
            "Cat1" => Ok(StormCategory::Category1),
            "Cat2" => Ok(StormCategory::Category2),
            "Cat3" => Ok(StormCategory::Category3),
            "Cat4" => Ok(StormCategory::Category4),
            "Cat5" => Ok(StormCategory::Category5),
            other => Err(format!("unknown storm category '{other}'")),
        }
    }
}

/// One rapid-intensification episode of a named tropical cyclone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiEvent {
    pub storm_id: String,
    pub storm_name: String,
    /// Time of the best-track fix the episode starts from.
    pub onset: NaiveDateTime,
    pub onset_lat: f64,
    pub onset_lon: f64,
    /// Time of the first fix satisfying the intensification threshold.
    pub end: NaiveDateTime,
    pub start_wind_kt: f64,
    pub end_wind_kt: f64,
    pub wind_change_kt: f64,
    pub duration_hours: f64,
    /// Category implied by the peak wind over the episode.
    pub category_reached: StormCategory,
}

impl RiEvent {
    /// Intensification rate in knots per hour.
    pub fn rate_kt_per_hour(&self) -> f64 {
        if self.duration_hours > 0.0 {
            self.wind_change_kt / self.duration_hours
        } else {
            f64::NAN
        }
    }
}

/// A marine heatwave and a rapid-intensification episode in spatiotemporal
/// proximity.
///
/// Events are referenced by their index in the input tables handed to the
/// matcher; the pair owns neither record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompoundPair {
    pub mhw_index: usize,
    pub ri_index: usize,
    /// Great-circle distance from the MHW cell center to the RI onset (km).
    pub distance_km: f64,
    /// Days from the MHW's active range to the RI onset: 0 while the MHW
    /// was active, positive after its end, negative before its start.
    pub lag_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_thresholds() {
        assert_eq!(
            StormCategory::from_wind_kt(20.0),
            StormCategory::TropicalDepression
        );
        assert_eq!(
            StormCategory::from_wind_kt(34.0),
            StormCategory::TropicalStorm
        );
        assert_eq!(StormCategory::from_wind_kt(64.0), StormCategory::Category1);
        assert_eq!(StormCategory::from_wind_kt(95.9), StormCategory::Category2);
        assert_eq!(StormCategory::from_wind_kt(96.0), StormCategory::Category3);
        assert_eq!(StormCategory::from_wind_kt(113.0), StormCategory::Category4);
        assert_eq!(StormCategory::from_wind_kt(150.0), StormCategory::Category5);
    }

    #[test]
    fn test_category_labels_round_trip() {
        for cat in [
            StormCategory::TropicalDepression,
            StormCategory::TropicalStorm,
            StormCategory::Category1,
            StormCategory::Category2,
            StormCategory::Category3,
            StormCategory::Category4,
            StormCategory::Category5,
        ] {
            let parsed: StormCategory = cat.to_string().parse().unwrap();
            assert_eq!(parsed, cat);
        }
        assert!("Cat6".parse::<StormCategory>().is_err());
    }

    #[test]
    fn test_ri_rate() {
        let event = RiEvent {
            storm_id: "AL092021".to_string(),
            storm_name: "IDA".to_string(),
            onset: chrono::NaiveDate::from_ymd_opt(2021, 8, 28)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            onset_lat: 22.8,
            onset_lon: -84.2,
            end: chrono::NaiveDate::from_ymd_opt(2021, 8, 29)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
            start_wind_kt: 70.0,
            end_wind_kt: 105.0,
            wind_change_kt: 35.0,
            duration_hours: 18.0,
            category_reached: StormCategory::Category3,
        };
        assert!((event.rate_kt_per_hour() - 35.0 / 18.0).abs() < 1e-12);
    }
}
