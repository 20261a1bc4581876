use serde::{Deserialize, Serialize};

use crate::metrics::round_to;
use crate::sample::EnrichedRecord;

use super::error::WindowError;
use super::types::{Window, WindowAggregate};

const STAT_DECIMALS: i32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSums {
    pub latitude_sum: f64,
    pub longitude_sum: f64,
}

/// Running sums for one open window; enough to finalize without keeping records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowAccumulator {
    pub count: u64,
    pub velocity_sum: f64,
    pub velocity_sum_sq: f64,
    pub velocity_min: f64,
    pub velocity_max: f64,
    pub position: Option<PositionSums>,
}

impl WindowAccumulator {
    /// Windows only exist once a record lands in them.
    pub fn from_first(record: &EnrichedRecord, track_position: bool) -> Self {
        let v = record.velocity_km_s;
        Self {
            count: 1,
            velocity_sum: v,
            velocity_sum_sq: v * v,
            velocity_min: v,
            velocity_max: v,
            position: track_position.then(|| PositionSums {
                latitude_sum: record.sample.latitude,
                longitude_sum: record.sample.longitude,
            }),
        }
    }

    pub fn observe(&mut self, record: &EnrichedRecord) {
        let v = record.velocity_km_s;
        self.count += 1;
        self.velocity_sum += v;
        self.velocity_sum_sq += v * v;
        self.velocity_min = self.velocity_min.min(v);
        self.velocity_max = self.velocity_max.max(v);
        if let Some(position) = self.position.as_mut() {
            position.latitude_sum += record.sample.latitude;
            position.longitude_sum += record.sample.longitude;
        }
    }

    pub fn finalize(&self, window: Window) -> Result<WindowAggregate, WindowError> {
        if self.count == 0 {
            return Err(WindowError::Empty(window.start));
        }
        let n = self.count as f64;
        let non_finite = |field| WindowError::NonFinite {
            start: window.start,
            field,
        };

        let avg = self.velocity_sum / n;
        if !avg.is_finite() {
            return Err(non_finite("avg_velocity"));
        }
        let mean_sq = self.velocity_sum_sq / n;
        if !mean_sq.is_finite() {
            return Err(non_finite("velocity_stddev"));
        }
        // Population variance; cancellation can leave a tiny negative value
        let stddev = (mean_sq - avg * avg).max(0.0).sqrt();

        let (avg_latitude, avg_longitude) = match &self.position {
            Some(p) => {
                let lat = p.latitude_sum / n;
                let lon = p.longitude_sum / n;
                if !lat.is_finite() || !lon.is_finite() {
                    return Err(non_finite("avg_position"));
                }
                (Some(round_to(lat, STAT_DECIMALS)), Some(round_to(lon, STAT_DECIMALS)))
            }
            None => (None, None),
        };

        Ok(WindowAggregate {
            window_start: window.start,
            window_end: window.end,
            data_points: self.count,
            avg_latitude,
            avg_longitude,
            avg_velocity: round_to(avg, STAT_DECIMALS),
            max_velocity: round_to(self.velocity_max, STAT_DECIMALS),
            min_velocity: round_to(self.velocity_min, STAT_DECIMALS),
            velocity_stddev: round_to(stddev, STAT_DECIMALS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{HemisphereEw, HemisphereNs, OrbitPhase, PositionSample};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Map;

    fn record(lat: f64, velocity: f64) -> EnrichedRecord {
        EnrichedRecord {
            sample: PositionSample {
                object_id: "iss".into(),
                latitude: lat,
                longitude: 10.0,
                event_time: Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 0).unwrap(),
                altitude_km: None,
                fetch_time: None,
                extra: Map::new(),
            },
            velocity_km_s: velocity,
            distance_to_reference_km: None,
            orbit_phase: OrbitPhase::Unknown,
            hemisphere_ns: HemisphereNs::North,
            hemisphere_ew: HemisphereEw::East,
        }
    }

    fn window() -> Window {
        Window::containing(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 0).unwrap(),
            Duration::minutes(1),
        )
        .unwrap()
    }

    #[test]
    fn population_statistics() {
        let mut acc = WindowAccumulator::from_first(&record(1.0, 2.0), true);
        for v in [4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.observe(&record(3.0, v));
        }
        let agg = acc.finalize(window()).unwrap();

        assert_eq!(agg.data_points, 8);
        assert_eq!(agg.avg_velocity, 5.0);
        assert_eq!(agg.velocity_stddev, 2.0);
        assert_eq!(agg.min_velocity, 2.0);
        assert_eq!(agg.max_velocity, 9.0);
        assert_eq!(agg.avg_latitude, Some(2.75));
        assert_eq!(agg.avg_longitude, Some(10.0));
    }

    #[test]
    fn constant_series_has_zero_stddev() {
        let v = 7.6543;
        let mut acc = WindowAccumulator::from_first(&record(0.0, v), false);
        for _ in 0..1000 {
            acc.observe(&record(0.0, v));
        }
        let agg = acc.finalize(window()).unwrap();

        assert_eq!(agg.velocity_stddev, 0.0);
        assert!(agg.velocity_stddev >= 0.0);
        assert_eq!(agg.avg_latitude, None);
    }

    #[test]
    fn single_point_window() {
        let agg = WindowAccumulator::from_first(&record(47.26, 4.68), true)
            .finalize(window())
            .unwrap();
        assert_eq!(agg.data_points, 1);
        assert_eq!(agg.velocity_stddev, 0.0);
        assert_eq!(agg.min_velocity, agg.max_velocity);
    }

    #[test]
    fn overflow_fails_the_window() {
        let mut acc = WindowAccumulator::from_first(&record(0.0, f64::MAX), false);
        acc.observe(&record(0.0, f64::MAX));
        let err = acc.finalize(window()).unwrap_err();
        assert!(matches!(err, WindowError::NonFinite { .. }));
    }
}
