/// Mean Earth radius used for all great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two (latitude, longitude) points in degrees.
pub fn haversine_km(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (lon2_deg - lon1_deg).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair outside [0, 1] for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: [(f64, f64); 6] = [
        (0.0, 0.0),
        (48.8566, 2.3522),
        (-15.3681, 6.4226),
        (51.6, -179.9),
        (-90.0, 0.0),
        (12.5, 180.0),
    ];

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lon) in POINTS {
            assert_eq!(haversine_km(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        for (lat1, lon1) in POINTS {
            for (lat2, lon2) in POINTS {
                let ab = haversine_km(lat1, lon1, lat2, lon2);
                let ba = haversine_km(lat2, lon2, lat1, lon1);
                assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
            }
        }
    }

    #[test]
    fn known_distances() {
        // Quarter of a great circle
        let d = haversine_km(0.0, 0.0, 0.0, 90.0);
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::FRAC_PI_2).abs() < 1e-6);

        // Antipodes
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);

        // Paris to London, roughly 344 km
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((d - 343.5).abs() < 1.0, "{d}");
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(4.680_049, 4), 4.68);
        assert_eq!(round_to(1234.5678, 2), 1234.57);
    }
}
