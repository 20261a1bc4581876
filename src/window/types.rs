use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Half-open, epoch-aligned interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The tumbling window of length `duration` that contains `t`, or
    /// `None` when either bound falls outside the representable time range.
    pub fn containing(t: DateTime<Utc>, duration: Duration) -> Option<Self> {
        let width = duration.num_milliseconds().max(1);
        let start_ms = t.timestamp_millis().div_euclid(width) * width;
        let start = DateTime::from_timestamp_millis(start_ms)?;
        let end = start.checked_add_signed(Duration::milliseconds(width))?;
        Some(Self { start, end })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// Statistics of one closed window, as handed to sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WindowAggregate {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub data_points: u64,
    pub avg_latitude: Option<f64>,
    pub avg_longitude: Option<f64>,
    pub avg_velocity: f64,
    pub max_velocity: f64,
    pub min_velocity: f64,
    pub velocity_stddev: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn assigns_floor_aligned_window() {
        let minute = Duration::minutes(1);
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 42).unwrap();
        let w = Window::containing(t, minute).unwrap();

        assert_eq!(w.start, Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 3, 1, 12, 36, 0).unwrap());
        assert!(w.contains(t));
    }

    #[test]
    fn boundaries_are_half_open() {
        let minute = Duration::minutes(1);
        let edge = Utc.with_ymd_and_hms(2025, 3, 1, 12, 36, 0).unwrap();
        let w = Window::containing(edge, minute).unwrap();

        assert_eq!(w.start, edge);
        assert!(!Window::containing(edge - Duration::milliseconds(1), minute)
            .unwrap()
            .contains(edge));
    }

    #[test]
    fn every_instant_lands_in_exactly_one_window() {
        let width = Duration::seconds(7);
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        for ms in (-20_000..20_000).step_by(997) {
            let t = base + Duration::milliseconds(ms);
            let w = Window::containing(t, width).unwrap();
            assert!(w.contains(t));
            assert_eq!(w.end - w.start, width);
            assert_eq!(w.start.timestamp_millis() % width.num_milliseconds(), 0);
            assert_eq!(Window::containing(w.start, width), Some(w));
        }
    }

    #[test]
    fn pre_epoch_instants_floor_downwards() {
        let t = DateTime::from_timestamp_millis(-1).unwrap();
        let w = Window::containing(t, Duration::seconds(60)).unwrap();
        assert_eq!(w.start.timestamp(), -60);
        assert_eq!(w.end.timestamp(), 0);
    }

    #[test]
    fn bounds_outside_time_range_have_no_window() {
        let minute = Duration::minutes(1);
        assert_eq!(Window::containing(DateTime::<Utc>::MAX_UTC, minute), None);
        assert_eq!(
            Window::containing(DateTime::<Utc>::MAX_UTC - Duration::seconds(1), minute),
            None
        );

        let near_end = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        assert!(Window::containing(near_end, minute).unwrap().contains(near_end));
    }
}
