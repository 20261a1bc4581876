use crate::metrics::MetricDeriver;
use crate::sample::{EnrichedRecord, PositionSample, ValidationError};

use super::state::SequencerState;

/// Attaches the previous sample of the same object to each incoming sample.
///
/// Ordering is arrival order per object. A sample older than its predecessor
/// is still enriched against it (yielding zero velocity) and then becomes the
/// new predecessor. Taking `&mut self` keeps a single writer per state.
pub struct Sequencer {
    deriver: MetricDeriver,
    state: SequencerState,
}

impl Sequencer {
    pub fn new(deriver: MetricDeriver) -> Self {
        Self::with_state(deriver, SequencerState::new())
    }

    pub fn with_state(deriver: MetricDeriver, state: SequencerState) -> Self {
        Self { deriver, state }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn replace_state(&mut self, state: SequencerState) -> SequencerState {
        std::mem::replace(&mut self.state, state)
    }

    pub fn deriver(&self) -> &MetricDeriver {
        &self.deriver
    }

    /// Enrich `sample` against the stored predecessor, then store the raw
    /// sample. Rejected samples leave the state untouched.
    pub fn advance(&mut self, sample: PositionSample) -> Result<EnrichedRecord, ValidationError> {
        let previous = self.state.previous(&sample.object_id);

        if let Some(prev) = previous {
            if sample.event_time < prev.event_time {
                log::debug!(
                    "Out-of-order sample for {}: {} after {}",
                    sample.object_id,
                    sample.event_time,
                    prev.event_time
                );
            }
        }

        let enriched = self.deriver.derive(sample, previous)?;
        self.state.record(enriched.sample.clone());
        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::OrbitPhase;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::Map;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample(object_id: &str, lat: f64, secs: i64) -> PositionSample {
        PositionSample {
            object_id: object_id.into(),
            latitude: lat,
            longitude: 10.0,
            event_time: t0() + Duration::seconds(secs),
            altitude_km: None,
            fetch_time: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn state_holds_the_raw_previous_sample() {
        let mut sequencer = Sequencer::new(MetricDeriver::default());

        let first = sequencer.advance(sample("iss", 10.0, 0)).unwrap();
        assert_eq!(first.orbit_phase, OrbitPhase::Unknown);
        assert_eq!(sequencer.state().previous("iss"), Some(&sample("iss", 10.0, 0)));

        let second = sequencer.advance(sample("iss", 11.0, 5)).unwrap();
        assert_eq!(second.orbit_phase, OrbitPhase::Ascending);
        assert!(second.velocity_km_s > 0.0);
        assert_eq!(sequencer.state().previous("iss"), Some(&sample("iss", 11.0, 5)));
    }

    #[test]
    fn objects_do_not_share_history() {
        let mut sequencer = Sequencer::new(MetricDeriver::default());

        sequencer.advance(sample("a", 10.0, 0)).unwrap();
        let b = sequencer.advance(sample("b", 20.0, 5)).unwrap();
        assert_eq!(b.orbit_phase, OrbitPhase::Unknown);
        assert_eq!(b.velocity_km_s, 0.0);

        let a = sequencer.advance(sample("a", 9.0, 5)).unwrap();
        assert_eq!(a.orbit_phase, OrbitPhase::Descending);
        assert_eq!(sequencer.state().len(), 2);
    }

    #[test]
    fn out_of_order_samples_follow_arrival_order() {
        let mut sequencer = Sequencer::new(MetricDeriver::default());

        sequencer.advance(sample("iss", 10.0, 10)).unwrap();
        let late = sequencer.advance(sample("iss", 9.0, 5)).unwrap();
        assert_eq!(late.velocity_km_s, 0.0);
        assert_eq!(late.orbit_phase, OrbitPhase::Descending);

        // The late sample is now the predecessor
        let next = sequencer.advance(sample("iss", 9.5, 15)).unwrap();
        assert_eq!(next.orbit_phase, OrbitPhase::Ascending);
        assert!(next.velocity_km_s > 0.0);
    }

    #[test]
    fn rejected_samples_do_not_update_state() {
        let mut sequencer = Sequencer::new(MetricDeriver::default());

        sequencer.advance(sample("iss", 10.0, 0)).unwrap();
        assert!(sequencer.advance(sample("iss", 120.0, 5)).is_err());
        assert_eq!(sequencer.state().previous("iss"), Some(&sample("iss", 10.0, 0)));
    }
}
