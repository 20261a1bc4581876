use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use super::error::SourceError;
use crate::metrics::round_to;
use crate::sample::{RawSample, RawTime};

// WGS-84
const WGS84_A_KM: f64 = 6378.137;
const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Synthetic producer: propagates a TLE with SGP4 and reports the
/// sub-satellite point in the same shape as the live position feed.
pub struct Simulator {
    object_id: String,
    elements: Elements,
    constants: Constants,
}

impl Simulator {
    pub fn from_tle(tle: &str, object_id: String) -> Result<Self, SourceError> {
        let (name, line1, line2) = parse_tle_sets(tle)
            .into_iter()
            .next()
            .ok_or(SourceError::InvalidTleFormat)?;
        let elements = Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())?;
        let constants = Constants::from_elements(&elements)?;
        Ok(Self {
            object_id,
            elements,
            constants,
        })
    }

    pub fn from_tle_file(path: &Path, object_id: String) -> Result<Self, SourceError> {
        let content = fs::read_to_string(path)?;
        Self::from_tle(&content, object_id)
    }

    pub fn object_name(&self) -> Option<&str> {
        self.elements.object_name.as_deref()
    }

    pub fn sample_at(&self, timestamp: DateTime<Utc>) -> Result<RawSample, SourceError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| SourceError::Propagation(e.to_string()))?;
        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| SourceError::Propagation(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));
        let ecef = teme_to_ecef_position(prediction.position, sidereal);
        let (latitude, longitude, altitude_km) = ecef_to_geodetic(ecef);

        Ok(RawSample {
            object_id: Some(self.object_id.clone()),
            latitude: Some(round_to(latitude, 4)),
            longitude: Some(round_to(longitude, 4)),
            timestamp: Some(RawTime::Epoch(timestamp.timestamp())),
            altitude_km: Some(round_to(altitude_km, 2)),
            fetch_time: Some(Utc::now().to_rfc3339()),
            ..RawSample::default()
        })
    }

    /// Samples from `start` to `end` inclusive, every `step`.
    pub fn samples(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<RawSample>, SourceError> {
        let mut cursor = start;
        let mut points = Vec::new();
        if step <= Duration::zero() {
            return Ok(points);
        }

        while cursor <= end {
            points.push(self.sample_at(cursor)?);
            match cursor.checked_add_signed(step) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(points)
    }
}

/// Split TLE text into (name, line1, line2) sets; names are optional.
pub fn parse_tle_sets(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

/// ECEF (km) to geodetic latitude/longitude (degrees) and height (km).
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = ecef;
    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    let mut n = WGS84_A_KM;
    for _ in 0..6 {
        let sin_lat = lat.sin();
        n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        lat = (z + WGS84_E2 * n * sin_lat).atan2(p);
    }

    let cos_lat = lat.cos();
    let alt = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        z.abs() - n * (1.0 - WGS84_E2)
    };

    (lat.to_degrees(), lon.to_degrees(), alt)
}
