mod error;
mod files;
mod simulator;

pub use error::SourceError;
pub use files::FileSource;
pub use simulator::Simulator;
