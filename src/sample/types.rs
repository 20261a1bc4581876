use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;

/// Time field as delivered by producers: epoch seconds or a formatted string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawTime {
    Epoch(i64),
    Fractional(f64),
    Text(String),
}

/// A record exactly as received from a producer, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<RawTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<RawTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated position of one tracked object at one instant.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PositionSample {
    pub object_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub event_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_km: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrbitPhase {
    Ascending,
    Descending,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
pub enum HemisphereNs {
    North,
    South,
}

impl HemisphereNs {
    /// The equator counts as North.
    pub fn from_latitude(latitude: f64) -> Self {
        if latitude >= 0.0 {
            HemisphereNs::North
        } else {
            HemisphereNs::South
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display)]
pub enum HemisphereEw {
    East,
    West,
}

impl HemisphereEw {
    /// The prime meridian counts as East.
    pub fn from_longitude(longitude: f64) -> Self {
        if longitude >= 0.0 {
            HemisphereEw::East
        } else {
            HemisphereEw::West
        }
    }
}

/// A sample plus the metrics derived from it and its predecessor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub sample: PositionSample,
    pub velocity_km_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_reference_km: Option<f64>,
    pub orbit_phase: OrbitPhase,
    pub hemisphere_ns: HemisphereNs,
    pub hemisphere_ew: HemisphereEw,
}

impl EnrichedRecord {
    pub fn event_time(&self) -> DateTime<Utc> {
        self.sample.event_time
    }

    pub fn object_id(&self) -> &str {
        &self.sample.object_id
    }
}
