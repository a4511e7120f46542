//! Great-circle geometry on the spherical Earth.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points via the haversine formula.
///
/// a = sin²(Δφ/2) + cos φ1 × cos φ2 × sin²(Δλ/2)
/// d = 2R × atan2(√a, √(1−a))
///
/// # Arguments
/// * `lat1`, `lon1` - First point (degrees)
/// * `lat2`, `lon2` - Second point (degrees)
///
/// # Returns
/// Distance in kilometers
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_distance() {
        assert_relative_eq!(haversine_km(25.0, -90.0, 25.0, -90.0), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere
        let d = haversine_km(25.0, -90.0, 26.0, -90.0);
        assert_relative_eq!(d, 111.19, epsilon = 0.05);
    }

    #[test]
    fn test_symmetry() {
        let d1 = haversine_km(18.0, -84.0, 27.5, -93.0);
        let d2 = haversine_km(27.5, -93.0, 18.0, -84.0);
        assert_relative_eq!(d1, d2, epsilon = 1e-9);
    }

    #[test]
    fn test_longitude_narrows_with_latitude() {
        // A degree of longitude spans less ground at higher latitude
        let equatorward = haversine_km(15.0, -90.0, 15.0, -89.0);
        let poleward = haversine_km(30.0, -90.0, 30.0, -89.0);
        assert!(poleward < equatorward);
    }
}
