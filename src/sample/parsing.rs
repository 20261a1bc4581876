use chrono::{DateTime, NaiveDateTime, Utc};

use super::error::ValidationError;
use super::types::{PositionSample, RawSample, RawTime};

pub const LATITUDE_LIMIT_DEG: f64 = 90.0;
pub const LONGITUDE_LIMIT_DEG: f64 = 180.0;

/// Validate a raw producer record into a `PositionSample`.
///
/// `event_time` wins over `timestamp` when both are present. Records without
/// an `object_id` (or with an empty one) are attributed to `default_object_id`.
pub fn parse_sample(raw: RawSample, default_object_id: &str) -> Result<PositionSample, ValidationError> {
    let latitude = raw.latitude.ok_or(ValidationError::MissingField("latitude"))?;
    let longitude = raw.longitude.ok_or(ValidationError::MissingField("longitude"))?;
    validate_coordinates(latitude, longitude)?;

    let time = raw
        .event_time
        .as_ref()
        .or(raw.timestamp.as_ref())
        .ok_or(ValidationError::MissingField("timestamp"))?;
    let event_time = parse_event_time(time)?;

    let object_id = raw
        .object_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| default_object_id.to_string());

    Ok(PositionSample {
        object_id,
        latitude,
        longitude,
        event_time,
        altitude_km: raw.altitude_km,
        fetch_time: raw.fetch_time,
        extra: raw.extra,
    })
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !latitude.is_finite() || latitude.abs() > LATITUDE_LIMIT_DEG {
        return Err(ValidationError::LatitudeOutOfRange(latitude));
    }
    if !longitude.is_finite() || longitude.abs() > LONGITUDE_LIMIT_DEG {
        return Err(ValidationError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

pub fn parse_event_time(time: &RawTime) -> Result<DateTime<Utc>, ValidationError> {
    match time {
        RawTime::Epoch(secs) => DateTime::from_timestamp(*secs, 0)
            .ok_or_else(|| ValidationError::InvalidTime(secs.to_string())),
        RawTime::Fractional(secs) => {
            if !secs.is_finite() {
                return Err(ValidationError::InvalidTime(secs.to_string()));
            }
            DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                .ok_or_else(|| ValidationError::InvalidTime(secs.to_string()))
        }
        RawTime::Text(s) => parse_time_text(s),
    }
}

fn parse_time_text(s: &str) -> Result<DateTime<Utc>, ValidationError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Naive timestamps are taken as UTC
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(secs) = s.parse::<i64>() {
        return parse_event_time(&RawTime::Epoch(secs));
    }

    Err(ValidationError::InvalidTime(s.to_string()))
}
