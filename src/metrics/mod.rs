mod derive;
mod geo;
mod reference;
mod types;

pub use derive::{orbit_phase, velocity_km_s, MetricDeriver};
pub use geo::{haversine_km, round_to, EARTH_RADIUS_KM};
pub use reference::ReferencePoint;
pub use types::{Metric, MetricSet};
