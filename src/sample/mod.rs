mod error;
mod parsing;
mod types;

pub use error::ValidationError;
pub use parsing::{parse_event_time, parse_sample, validate_coordinates};
pub use types::{
    EnrichedRecord, HemisphereEw, HemisphereNs, OrbitPhase, PositionSample, RawSample, RawTime,
};
