use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use super::{EmissionSink, SinkError};
use crate::sample::EnrichedRecord;
use crate::window::WindowAggregate;

/// Writes each non-empty batch as a JSON-lines file under `processed/` and
/// `statistics/`.
pub struct JsonDirSink {
    base: PathBuf,
}

impl JsonDirSink {
    pub fn new(base: PathBuf) -> Result<Self, SinkError> {
        fs::create_dir_all(base.join("processed"))?;
        fs::create_dir_all(base.join("statistics"))?;
        Ok(Self { base })
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.base.join("processed")
    }

    pub fn statistics_dir(&self) -> PathBuf {
        self.base.join("statistics")
    }

    fn write_batch<T: Serialize>(&self, dir: &Path, items: &[T]) -> Result<(), SinkError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for item in items {
            serde_json::to_writer(&mut buf, item)?;
            buf.push(b'\n');
        }

        // Write under a dot-name first so directory readers never see partial files
        let name = generate_file_name();
        let tmp = dir.join(format!(".{}", name));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&buf)?;
        file.sync_all()?;
        fs::rename(&tmp, dir.join(name))?;
        Ok(())
    }
}

impl EmissionSink for JsonDirSink {
    fn name(&self) -> &'static str {
        "json"
    }

    fn emit_records(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError> {
        self.write_batch(&self.processed_dir(), records)
    }

    fn emit_windows(&mut self, windows: &[WindowAggregate]) -> Result<(), SinkError> {
        self.write_batch(&self.statistics_dir(), windows)
    }
}

fn generate_file_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    format!("{}_{}.jsonl", timestamp, uuid)
}
