mod checkpoint;
mod driver;
mod error;
mod pipeline;
mod report;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use driver::Driver;
pub use error::{CheckpointError, PipelineError};
pub use pipeline::{partition_by_object, Pipeline};
pub use report::{BatchReport, BatchSummary, PipelineStats, PipelineStatus, Rejection};
