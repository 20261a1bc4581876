mod accumulator;
mod aggregator;
mod error;
mod types;

pub use accumulator::{PositionSums, WindowAccumulator};
pub use aggregator::{AggregatorSnapshot, IngestOutcome, WindowAggregator, WindowResult, WindowSlot};
pub use error::WindowError;
pub use types::{Window, WindowAggregate};
