mod console;
mod error;
mod json_dir;
mod memory;

pub use console::ConsoleSink;
pub use error::SinkError;
pub use json_dir::JsonDirSink;
pub use memory::MemorySink;

use crate::sample::EnrichedRecord;
use crate::window::WindowAggregate;

/// Consumer of pipeline output. Implementations own durability; the pipeline
/// only logs their failures.
pub trait EmissionSink {
    fn name(&self) -> &'static str;
    fn emit_records(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError>;
    fn emit_windows(&mut self, windows: &[WindowAggregate]) -> Result<(), SinkError>;
}
