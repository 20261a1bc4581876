use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Optional metrics that can be switched off in configuration.
///
/// Velocity and hemisphere classification are always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Metric {
    DistanceToReference,
    OrbitPhase,
    PositionStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet(HashSet<Metric>);

impl MetricSet {
    pub fn all() -> Self {
        Self(
            [Metric::DistanceToReference, Metric::OrbitPhase, Metric::PositionStats]
                .into_iter()
                .collect(),
        )
    }

    pub fn none() -> Self {
        Self(HashSet::new())
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.0.contains(&metric)
    }

    pub fn with(mut self, metric: Metric) -> Self {
        self.0.insert(metric);
        self
    }

    pub fn without(mut self, metric: Metric) -> Self {
        self.0.remove(&metric);
        self
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<Metric> for MetricSet {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
