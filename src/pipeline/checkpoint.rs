use std::{fs, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::CheckpointError;
use super::report::PipelineStats;
use crate::sequencer::SequencerState;
use crate::window::AggregatorSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub created_at: DateTime<Utc>,
    pub sequencer: SequencerState,
    pub aggregator: AggregatorSnapshot,
    pub stats: PipelineStats,
}

/// YAML file holding the latest checkpoint.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_yaml::from_str(&content)?))
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_yaml::to_string(checkpoint)?)?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CheckpointError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
