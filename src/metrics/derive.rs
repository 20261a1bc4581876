use std::collections::HashMap;

use crate::sample::{
    validate_coordinates, EnrichedRecord, HemisphereEw, HemisphereNs, OrbitPhase, PositionSample,
    ValidationError,
};

use super::geo::{haversine_km, round_to};
use super::reference::ReferencePoint;
use super::types::{Metric, MetricSet};

const VELOCITY_DECIMALS: i32 = 4;
const DISTANCE_DECIMALS: i32 = 2;

/// Stateless per-record transform from (current, previous) samples to an
/// `EnrichedRecord`.
#[derive(Debug, Clone)]
pub struct MetricDeriver {
    metrics: MetricSet,
    reference: Option<ReferencePoint>,
    object_references: HashMap<String, ReferencePoint>,
}

impl Default for MetricDeriver {
    fn default() -> Self {
        Self::new(MetricSet::all(), Some(ReferencePoint::paris()), HashMap::new())
    }
}

impl MetricDeriver {
    pub fn new(
        metrics: MetricSet,
        reference: Option<ReferencePoint>,
        object_references: HashMap<String, ReferencePoint>,
    ) -> Self {
        Self {
            metrics,
            reference,
            object_references,
        }
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Per-object references shadow the global one.
    pub fn reference_for(&self, object_id: &str) -> Option<&ReferencePoint> {
        self.object_references
            .get(object_id)
            .or(self.reference.as_ref())
    }

    pub fn derive(
        &self,
        current: PositionSample,
        previous: Option<&PositionSample>,
    ) -> Result<EnrichedRecord, ValidationError> {
        validate_coordinates(current.latitude, current.longitude)?;
        if let Some(prev) = previous {
            validate_coordinates(prev.latitude, prev.longitude)?;
        }

        let velocity_km_s = round_to(velocity_km_s(&current, previous), VELOCITY_DECIMALS);

        let distance_to_reference_km = if self.metrics.contains(Metric::DistanceToReference) {
            self.reference_for(&current.object_id)
                .map(|r| round_to(r.distance_km(current.latitude, current.longitude), DISTANCE_DECIMALS))
        } else {
            None
        };

        let orbit_phase = if self.metrics.contains(Metric::OrbitPhase) {
            orbit_phase(&current, previous)
        } else {
            OrbitPhase::Unknown
        };

        Ok(EnrichedRecord {
            hemisphere_ns: HemisphereNs::from_latitude(current.latitude),
            hemisphere_ew: HemisphereEw::from_longitude(current.longitude),
            sample: current,
            velocity_km_s,
            distance_to_reference_km,
            orbit_phase,
        })
    }
}

/// Ground-track speed between two samples; 0.0 without a usable predecessor.
pub fn velocity_km_s(current: &PositionSample, previous: Option<&PositionSample>) -> f64 {
    let Some(prev) = previous else {
        return 0.0;
    };

    let elapsed_s = (current.event_time - prev.event_time).num_milliseconds() as f64 / 1000.0;
    if elapsed_s <= 0.0 {
        return 0.0;
    }

    let distance = haversine_km(prev.latitude, prev.longitude, current.latitude, current.longitude);
    let velocity = distance / elapsed_s;
    if velocity.is_finite() {
        velocity.max(0.0)
    } else {
        0.0
    }
}

pub fn orbit_phase(current: &PositionSample, previous: Option<&PositionSample>) -> OrbitPhase {
    match previous {
        Some(prev) if current.latitude > prev.latitude => OrbitPhase::Ascending,
        Some(prev) if current.latitude < prev.latitude => OrbitPhase::Descending,
        _ => OrbitPhase::Unknown,
    }
}
