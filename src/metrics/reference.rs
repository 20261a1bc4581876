use serde::{Deserialize, Serialize};

use crate::sample::{validate_coordinates, ValidationError};

use super::geo::haversine_km;

/// A fixed point on the ground that distances are measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl ReferencePoint {
    pub fn new(name: Option<String>, latitude_deg: f64, longitude_deg: f64) -> Result<Self, ValidationError> {
        validate_coordinates(latitude_deg, longitude_deg)?;
        Ok(Self {
            name,
            latitude_deg,
            longitude_deg,
        })
    }

    /// Parse a `"lat,lon"` pair.
    pub fn from_coordinates(name: Option<String>, coordinates: &str) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat = parts[0].parse().ok()?;
        let lon = parts[1].parse().ok()?;
        Self::new(name, lat, lon).ok()
    }

    /// Paris, the default reference point for distance.
    pub fn paris() -> Self {
        Self {
            name: Some("Paris".to_string()),
            latitude_deg: 48.8566,
            longitude_deg: 2.3522,
        }
    }

    pub fn distance_km(&self, latitude_deg: f64, longitude_deg: f64) -> f64 {
        haversine_km(latitude_deg, longitude_deg, self.latitude_deg, self.longitude_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_pairs() {
        let p = ReferencePoint::from_coordinates(None, " 48.8566 , 2.3522 ").unwrap();
        assert_eq!(p.latitude_deg, 48.8566);
        assert_eq!(p.longitude_deg, 2.3522);

        assert!(ReferencePoint::from_coordinates(None, "48.8566").is_none());
        assert!(ReferencePoint::from_coordinates(None, "north,east").is_none());
        assert!(ReferencePoint::from_coordinates(None, "95,0").is_none());
        assert!(ReferencePoint::from_coordinates(None, "1,2,3").is_none());
    }

    #[test]
    fn distance_from_reference_to_itself() {
        let paris = ReferencePoint::paris();
        assert_eq!(paris.distance_km(48.8566, 2.3522), 0.0);
    }
}
