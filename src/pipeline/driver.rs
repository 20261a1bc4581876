use chrono::{DateTime, Utc};

use super::checkpoint::CheckpointStore;
use super::error::PipelineError;
use super::pipeline::Pipeline;
use super::report::BatchReport;
use crate::config::Config;
use crate::sample::RawSample;
use crate::sink::{ConsoleSink, EmissionSink, JsonDirSink};

/// Runs batches through a `Pipeline`, fans results out to the sinks and
/// persists a checkpoint after every batch.
pub struct Driver {
    pipeline: Pipeline,
    sinks: Vec<Box<dyn EmissionSink + Send>>,
    checkpoints: Option<CheckpointStore>,
}

impl Driver {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            sinks: Vec::new(),
            checkpoints: None,
        }
    }

    /// Pipeline plus the sinks and checkpoint store named in `config.output`.
    /// An existing checkpoint is restored unless `clean` is set, in which
    /// case it is deleted first.
    pub fn from_config(config: &Config, clean: bool) -> Result<Self, PipelineError> {
        let mut pipeline = Pipeline::from_config(config)?;
        let output = &config.output;

        let store = output.checkpoint.clone().map(CheckpointStore::new);
        if let Some(store) = &store {
            if clean {
                store.clear()?;
                log::info!("Removed previous checkpoint");
            } else if let Some(checkpoint) = store.load()? {
                log::info!(
                    "Restoring checkpoint from {} ({} tracked object(s))",
                    checkpoint.created_at,
                    checkpoint.sequencer.len()
                );
                pipeline.restore(checkpoint)?;
            }
        }

        let mut driver = Self::new(pipeline);
        if let Some(folder) = &output.folder {
            driver = driver.with_sink(Box::new(JsonDirSink::new(folder.clone())?));
        }
        if output.console {
            driver = driver.with_sink(Box::new(ConsoleSink));
        }
        if let Some(store) = store {
            driver = driver.with_checkpoints(store);
        }
        Ok(driver)
    }

    pub fn with_sink(mut self, sink: Box<dyn EmissionSink + Send>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_checkpoints(mut self, store: CheckpointStore) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn run_batch(&mut self, batch: Vec<RawSample>) -> BatchReport {
        let report = self.pipeline.ingest_batch(batch);
        self.finish(report)
    }

    pub fn run_json(&mut self, batch: Vec<serde_json::Value>) -> BatchReport {
        let report = self.pipeline.ingest_json(batch);
        self.finish(report)
    }

    pub fn tick(&mut self, event_time: DateTime<Utc>) -> BatchReport {
        let report = self.pipeline.tick(event_time);
        self.finish(report)
    }

    pub fn flush(&mut self) -> BatchReport {
        let report = self.pipeline.flush();
        self.finish(report)
    }

    fn finish(&mut self, report: BatchReport) -> BatchReport {
        if report.is_empty() {
            return report;
        }

        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.emit_records(&report.records) {
                log::error!("Sink {} failed to emit records: {}", sink.name(), e);
            }
            if let Err(e) = sink.emit_windows(&report.windows) {
                log::error!("Sink {} failed to emit windows: {}", sink.name(), e);
            }
        }

        if let Some(store) = &self.checkpoints {
            if let Err(e) = store.save(&self.pipeline.checkpoint()) {
                log::error!("Failed to save checkpoint: {}", e);
            }
        }

        report
    }
}
