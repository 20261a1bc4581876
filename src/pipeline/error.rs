use thiserror::Error;

use crate::config::ConfigError;
use crate::sink::SinkError;
use crate::window::WindowError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("window error: {0}")]
    Window(#[from] WindowError),
    #[error("duration out of range: {0}")]
    DurationOutOfRange(String),
    #[error("checkpoint was written with a {found} ms window, pipeline uses {expected} ms")]
    IncompatibleCheckpoint { expected: i64, found: i64 },
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
