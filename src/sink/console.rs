use super::{EmissionSink, SinkError};
use crate::sample::EnrichedRecord;
use crate::window::WindowAggregate;

/// Logs every record and window at `info`.
pub struct ConsoleSink;

impl EmissionSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn emit_records(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError> {
        for r in records {
            let distance = r
                .distance_to_reference_km
                .map(|d| format!("{:.2} km", d))
                .unwrap_or_else(|| "-".to_string());
            log::info!(
                "[{}] {} ({:.4}, {:.4}) | velocity {:.4} km/s | reference {} | {} {}/{}",
                r.sample.object_id,
                r.sample.event_time,
                r.sample.latitude,
                r.sample.longitude,
                r.velocity_km_s,
                distance,
                r.orbit_phase,
                r.hemisphere_ns,
                r.hemisphere_ew
            );
        }
        Ok(())
    }

    fn emit_windows(&mut self, windows: &[WindowAggregate]) -> Result<(), SinkError> {
        for w in windows {
            log::info!(
                "Window {} - {}: {} points, velocity avg {:.4} min {:.4} max {:.4} stddev {:.4}",
                w.window_start,
                w.window_end,
                w.data_points,
                w.avg_velocity,
                w.min_velocity,
                w.max_velocity,
                w.velocity_stddev
            );
        }
        Ok(())
    }
}
