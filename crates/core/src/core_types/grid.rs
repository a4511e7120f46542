use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution of the internal coordinate representation (millidegrees).
const MILLI: f64 = 1000.0;

/// A spatial grid cell identified by its center coordinates.
///
/// Coordinates are stored in millidegrees as integers so cells compare
/// exactly and can key hash maps. One millidegree (~111 m in latitude) is
/// far below any SST product's grid spacing, so rounding never collides
/// distinct cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    lat_milli: i32,
    lon_milli: i32,
}

impl GridCell {
    /// Create a cell from center coordinates in degrees.
    ///
    /// Latitude is positive north, longitude positive east (western
    /// hemisphere longitudes are negative, e.g. -90.125 for the central
    /// Gulf of Mexico).
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        GridCell {
            lat_milli: (lat * MILLI).round() as i32,
            lon_milli: (lon * MILLI).round() as i32,
        }
    }

    /// Center latitude in degrees.
    pub fn lat(&self) -> f64 {
        f64::from(self.lat_milli) / MILLI
    }

    /// Center longitude in degrees.
    pub fn lon(&self) -> f64 {
        f64::from(self.lon_milli) / MILLI
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.lat(), self.lon())
    }
}
