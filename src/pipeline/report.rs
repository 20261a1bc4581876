use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sample::EnrichedRecord;
use crate::window::WindowAggregate;

/// A record refused by validation, identified by its position in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Rejection {
    pub index: usize,
    pub object_id: Option<String>,
    pub reason: String,
}

/// Everything one `ingest_batch`/`tick`/`flush` call produced.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Accepted records in arrival order.
    pub records: Vec<EnrichedRecord>,
    pub windows: Vec<WindowAggregate>,
    pub rejected: Vec<Rejection>,
    pub late_dropped: usize,
    pub failed_windows: usize,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
            && self.windows.is_empty()
            && self.rejected.is_empty()
            && self.late_dropped == 0
            && self.failed_windows == 0
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            accepted: self.records.len(),
            rejected: self.rejected.clone(),
            late_dropped: self.late_dropped,
            windows_closed: self.windows.len(),
            windows_failed: self.failed_windows,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchSummary {
    pub accepted: usize,
    pub rejected: Vec<Rejection>,
    pub late_dropped: usize,
    pub windows_closed: usize,
    pub windows_failed: usize,
}

/// Lifetime counters, carried across checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PipelineStats {
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub records_late: u64,
    pub windows_emitted: u64,
    pub windows_failed: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PipelineStatus {
    pub stats: PipelineStats,
    pub open_windows: usize,
    pub tracked_objects: usize,
    pub watermark: Option<DateTime<Utc>>,
}
