use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::checkpoint::Checkpoint;
use super::error::PipelineError;
use super::report::{BatchReport, PipelineStats, PipelineStatus, Rejection};
use crate::config::Config;
use crate::metrics::{Metric, MetricDeriver};
use crate::sample::{parse_sample, PositionSample, RawSample, ValidationError};
use crate::sequencer::Sequencer;
use crate::window::{WindowAggregator, WindowResult};

type RawRejection = (Option<String>, ValidationError);

/// Sample-to-metrics transform plus windowed aggregation, driven one
/// micro-batch at a time by the caller.
pub struct Pipeline {
    default_object_id: String,
    sequencer: Sequencer,
    aggregator: WindowAggregator,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(default_object_id: String, sequencer: Sequencer, aggregator: WindowAggregator) -> Self {
        Self {
            default_object_id,
            sequencer,
            aggregator,
            stats: PipelineStats::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        config.validate()?;
        let settings = &config.pipeline;

        let deriver = MetricDeriver::new(
            settings.metrics.clone(),
            config.reference_point()?,
            config.object_reference_points()?,
        );
        let aggregator = WindowAggregator::new(
            to_chrono(settings.window)?,
            to_chrono(settings.allowed_lateness)?,
            settings.metrics.contains(Metric::PositionStats),
            settings.closed_window_retention,
        )?;

        Ok(Self::new(
            settings.default_object_id.clone(),
            Sequencer::new(deriver),
            aggregator,
        ))
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            stats: self.stats.clone(),
            open_windows: self.aggregator.open_windows(),
            tracked_objects: self.sequencer.state().len(),
            watermark: self.aggregator.watermark(),
        }
    }

    /// Validate and process one batch of raw records. Bad records are
    /// rejected individually; the rest of the batch is unaffected.
    pub fn ingest_batch(&mut self, batch: Vec<RawSample>) -> BatchReport {
        self.ingest_entries(batch.into_iter().map(Ok).collect())
    }

    /// Like `ingest_batch`, for records still in JSON form. An entry that
    /// does not have the record shape is rejected on its own.
    pub fn ingest_json(&mut self, batch: Vec<Value>) -> BatchReport {
        let entries = batch
            .into_iter()
            .map(|value| {
                let object_id = value
                    .get("object_id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                serde_json::from_value::<RawSample>(value)
                    .map_err(|e| (object_id, ValidationError::from(e)))
            })
            .collect();
        self.ingest_entries(entries)
    }

    fn ingest_entries(&mut self, entries: Vec<Result<RawSample, RawRejection>>) -> BatchReport {
        let mut report = BatchReport::default();
        let mut accepted = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let raw = match entry {
                Ok(raw) => raw,
                Err((object_id, e)) => {
                    self.reject(&mut report, index, object_id, e);
                    continue;
                }
            };
            let object_id = raw.object_id.clone();
            let parsed = parse_sample(raw, &self.default_object_id).and_then(|sample| {
                // Refuse before the sequencer sees it so no state is touched
                self.aggregator
                    .window_for(sample.event_time)
                    .map(|_| sample)
                    .map_err(|e| ValidationError::InvalidTime(e.to_string()))
            });
            match parsed {
                Ok(sample) => accepted.push((index, sample)),
                Err(e) => self.reject(&mut report, index, object_id, e),
            }
        }

        self.process(accepted, &mut report);
        report
    }

    /// Advance the watermark as if a record at `event_time` had been seen.
    pub fn tick(&mut self, event_time: DateTime<Utc>) -> BatchReport {
        let mut report = BatchReport::default();
        let closed = self.aggregator.advance_to(event_time);
        self.collect_windows(closed, &mut report);
        report
    }

    /// Close all open windows; used at end of input.
    pub fn flush(&mut self) -> BatchReport {
        let mut report = BatchReport::default();
        let closed = self.aggregator.flush();
        self.collect_windows(closed, &mut report);
        report
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            created_at: Utc::now(),
            sequencer: self.sequencer.state().clone(),
            aggregator: self.aggregator.snapshot(),
            stats: self.stats.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), PipelineError> {
        let found = checkpoint.aggregator.window_ms;
        if !self.aggregator.restore(checkpoint.aggregator) {
            return Err(PipelineError::IncompatibleCheckpoint {
                expected: self.aggregator.duration().num_milliseconds(),
                found,
            });
        }
        self.sequencer.replace_state(checkpoint.sequencer);
        self.stats = checkpoint.stats;
        Ok(())
    }

    fn process(&mut self, accepted: Vec<(usize, PositionSample)>, report: &mut BatchReport) {
        let mut enriched = Vec::with_capacity(accepted.len());

        for partition in partition_by_object(accepted) {
            for (index, sample) in partition {
                let object_id = sample.object_id.clone();
                let record = match self.sequencer.advance(sample) {
                    Ok(record) => record,
                    Err(e) => {
                        self.reject(report, index, Some(object_id), e);
                        continue;
                    }
                };

                match self.aggregator.ingest(&record) {
                    Ok(outcome) => {
                        if outcome.late {
                            report.late_dropped += 1;
                            self.stats.records_late += 1;
                        }
                        self.collect_windows(outcome.closed, report);
                    }
                    Err(e) => log::error!("Record {} left out of windows: {}", index, e),
                }

                self.stats.records_accepted += 1;
                enriched.push((index, record));
            }
        }

        if report.late_dropped > 0 {
            log::warn!(
                "Dropped {} record(s) behind the watermark {:?}",
                report.late_dropped,
                self.aggregator.watermark()
            );
        }

        enriched.sort_by_key(|(index, _)| *index);
        report.records = enriched.into_iter().map(|(_, r)| r).collect();
    }

    fn reject(
        &mut self,
        report: &mut BatchReport,
        index: usize,
        object_id: Option<String>,
        err: ValidationError,
    ) {
        log::warn!("Rejected record {} ({:?}): {}", index, object_id, err);
        self.stats.records_rejected += 1;
        report.rejected.push(Rejection {
            index,
            object_id,
            reason: err.to_string(),
        });
    }

    fn collect_windows(&mut self, closed: Vec<WindowResult>, report: &mut BatchReport) {
        for result in closed {
            match result {
                Ok(window) => {
                    self.stats.windows_emitted += 1;
                    report.windows.push(window);
                }
                Err(e) => {
                    log::error!("Discarding window: {}", e);
                    self.stats.windows_failed += 1;
                    report.failed_windows += 1;
                }
            }
        }
    }
}

/// Group by object id, keeping arrival order inside each group and ordering
/// groups by first appearance. Each group must be handled by one writer.
pub fn partition_by_object(
    samples: Vec<(usize, PositionSample)>,
) -> Vec<Vec<(usize, PositionSample)>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut partitions: Vec<Vec<(usize, PositionSample)>> = Vec::new();

    for (index, sample) in samples {
        let slot = *slots.entry(sample.object_id.clone()).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push((index, sample));
    }

    partitions
}

fn to_chrono(d: std::time::Duration) -> Result<Duration, PipelineError> {
    Duration::from_std(d).map_err(|e| PipelineError::DurationOutOfRange(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::OrbitPhase;
    use chrono::TimeZone;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawSample {
        serde_json::from_value(value).unwrap()
    }

    fn pipeline() -> Pipeline {
        Pipeline::from_config(&Config::default()).unwrap()
    }

    fn epoch(h: u32, m: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, s).unwrap().timestamp()
    }

    #[test]
    fn enriches_consecutive_samples() {
        let mut pipeline = pipeline();
        let report = pipeline.ingest_batch(vec![
            raw(json!({ "latitude": -15.3681, "longitude": 6.4226, "timestamp": 0 })),
            raw(json!({ "latitude": -15.6155, "longitude": 6.6177, "timestamp": 5 })),
        ]);

        assert_eq!(report.records.len(), 2);
        assert!(report.rejected.is_empty());
        let second = &report.records[1];
        assert_eq!(second.orbit_phase, OrbitPhase::Descending);
        assert!(second.velocity_km_s > 0.0);
        assert_eq!(second.hemisphere_ns.to_string(), "South");
        assert_eq!(second.hemisphere_ew.to_string(), "East");
    }

    #[test]
    fn bad_records_are_isolated() {
        let mut pipeline = pipeline();
        let report = pipeline.ingest_batch(vec![
            raw(json!({ "latitude": 10.0, "longitude": 20.0, "timestamp": 0 })),
            raw(json!({ "object_id": "iss", "latitude": 100.0, "longitude": 20.0, "timestamp": 5 })),
            raw(json!({ "longitude": 20.0, "timestamp": 7 })),
            raw(json!({ "latitude": 11.0, "longitude": 20.0, "timestamp": 10 })),
        ]);

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].object_id.as_deref(), Some("iss"));
        assert_eq!(report.rejected[1].index, 2);

        // The rejected sample never became the predecessor
        let last = &report.records[1];
        assert_eq!(last.orbit_phase, OrbitPhase::Ascending);
        assert_eq!(pipeline.stats().records_rejected, 2);
        assert_eq!(pipeline.stats().records_accepted, 2);
    }

    #[test]
    fn interleaved_objects_keep_separate_history_and_arrival_order() {
        let mut pipeline = pipeline();
        let report = pipeline.ingest_batch(vec![
            raw(json!({ "object_id": "a", "latitude": 10.0, "longitude": 0.0, "timestamp": 0 })),
            raw(json!({ "object_id": "b", "latitude": -10.0, "longitude": 0.0, "timestamp": 0 })),
            raw(json!({ "object_id": "a", "latitude": 11.0, "longitude": 0.0, "timestamp": 5 })),
            raw(json!({ "object_id": "b", "latitude": -11.0, "longitude": 0.0, "timestamp": 5 })),
        ]);

        let ids: Vec<_> = report.records.iter().map(|r| r.object_id()).collect();
        assert_eq!(ids, vec!["a", "b", "a", "b"]);
        assert_eq!(report.records[2].orbit_phase, OrbitPhase::Ascending);
        assert_eq!(report.records[3].orbit_phase, OrbitPhase::Descending);
        assert_eq!(pipeline.status().tracked_objects, 2);
    }

    #[test]
    fn windows_close_across_batches_and_late_records_drop() {
        let mut pipeline = pipeline();

        let report = pipeline.ingest_batch(vec![
            raw(json!({ "latitude": 47.20, "longitude": 8.0, "timestamp": epoch(12, 35, 5) })),
            raw(json!({ "latitude": 47.26, "longitude": 8.1, "timestamp": epoch(12, 35, 25) })),
            raw(json!({ "latitude": 47.32, "longitude": 8.2, "timestamp": epoch(12, 35, 45) })),
        ]);
        assert!(report.windows.is_empty());

        let report = pipeline.ingest_batch(vec![raw(
            json!({ "latitude": 47.40, "longitude": 8.3, "timestamp": epoch(12, 36, 15) }),
        )]);
        assert_eq!(report.windows.len(), 1);
        let window = &report.windows[0];
        assert_eq!(window.data_points, 3);
        assert_eq!(window.avg_latitude, Some(47.26));
        assert_eq!(window.avg_longitude, Some(8.1));
        assert_eq!(
            window.window_start,
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 0).unwrap()
        );

        let report = pipeline.ingest_batch(vec![raw(
            json!({ "latitude": 47.30, "longitude": 8.2, "timestamp": epoch(12, 35, 50) }),
        )]);
        assert_eq!(report.late_dropped, 1);
        assert!(report.windows.is_empty());
        // Late records are still enriched and emitted per record
        assert_eq!(report.records.len(), 1);

        let report = pipeline.flush();
        assert_eq!(report.windows.len(), 1);
        assert_eq!(report.windows[0].data_points, 1);
        assert_eq!(pipeline.stats().records_late, 1);
        assert_eq!(pipeline.stats().windows_emitted, 2);
    }

    #[test]
    fn tick_closes_idle_windows() {
        let mut pipeline = pipeline();
        pipeline.ingest_batch(vec![raw(
            json!({ "latitude": 1.0, "longitude": 1.0, "timestamp": epoch(12, 0, 30) }),
        )]);
        assert!(pipeline.tick(Utc.with_ymd_and_hms(2025, 3, 1, 12, 1, 5).unwrap()).windows.is_empty());
        assert_eq!(
            pipeline.tick(Utc.with_ymd_and_hms(2025, 3, 1, 12, 1, 10).unwrap()).windows.len(),
            1
        );
    }

    #[test]
    fn checkpoint_restores_previous_positions_and_windows() {
        let mut first = pipeline();
        first.ingest_batch(vec![raw(
            json!({ "latitude": 10.0, "longitude": 0.0, "timestamp": epoch(12, 0, 0), "fetch_time": "x" }),
        )]);
        let yaml = serde_yaml::to_string(&first.checkpoint()).unwrap();

        let mut second = pipeline();
        second.restore(serde_yaml::from_str(&yaml).unwrap()).unwrap();
        let report = second.ingest_batch(vec![raw(
            json!({ "latitude": 9.0, "longitude": 0.0, "timestamp": epoch(12, 0, 5) }),
        )]);
        assert_eq!(report.records[0].orbit_phase, OrbitPhase::Descending);
        assert!(report.records[0].velocity_km_s > 0.0);

        let flushed = second.flush();
        assert_eq!(flushed.windows[0].data_points, 2);
        assert_eq!(second.stats().records_accepted, 2);
    }

    #[test]
    fn checkpoint_with_other_window_length_is_refused() {
        let mut config = Config::default();
        config.pipeline.window = std::time::Duration::from_secs(30);
        let mut other = Pipeline::from_config(&config).unwrap();

        let err = other.restore(pipeline().checkpoint()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::IncompatibleCheckpoint { expected: 30_000, found: 60_000 }
        ));
    }

    #[test]
    fn partitions_preserve_per_object_order() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let sample = |id: &str| PositionSample {
            object_id: id.into(),
            latitude: 0.0,
            longitude: 0.0,
            event_time: t,
            altitude_km: None,
            fetch_time: None,
            extra: Default::default(),
        };
        let parts = partition_by_object(vec![
            (0, sample("b")),
            (1, sample("a")),
            (2, sample("b")),
            (3, sample("a")),
        ]);
        let indices: Vec<Vec<usize>> = parts
            .iter()
            .map(|p| p.iter().map(|(i, _)| *i).collect())
            .collect();
        assert_eq!(indices, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn instants_at_time_range_limits_are_rejected_without_touching_state() {
        let mut pipeline = pipeline();
        let report = pipeline.ingest_batch(vec![
            raw(json!({ "latitude": 1.0, "longitude": 1.0, "timestamp": DateTime::<Utc>::MAX_UTC.timestamp() })),
            raw(json!({ "latitude": 1.0, "longitude": 1.0, "timestamp": DateTime::<Utc>::MIN_UTC.timestamp() + 1 })),
            raw(json!({ "latitude": 2.0, "longitude": 1.0, "timestamp": epoch(12, 0, 0) })),
        ]);

        let indices: Vec<_> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(report.rejected[0].reason.starts_with("invalid event time"));
        assert_eq!(report.records.len(), 1);
        // The refused instants never became a predecessor
        assert_eq!(report.records[0].velocity_km_s, 0.0);
        assert_eq!(report.records[0].orbit_phase, OrbitPhase::Unknown);
        assert_eq!(pipeline.stats().records_rejected, 2);
        assert_eq!(pipeline.status().open_windows, 1);
    }

    #[test]
    fn json_entries_with_wrong_types_are_rejected_individually() {
        let mut pipeline = pipeline();
        let report = pipeline.ingest_json(vec![
            json!({ "latitude": 10.0, "longitude": 20.0, "timestamp": epoch(12, 0, 0) }),
            json!({ "object_id": "hubble", "latitude": "ten", "longitude": 20.0, "timestamp": epoch(12, 0, 5) }),
            json!({ "latitude": 10.0, "longitude": 20.0, "timestamp": true }),
            json!(42),
            json!({ "latitude": 11.0, "longitude": 20.0, "timestamp": epoch(12, 0, 10) }),
        ]);

        assert_eq!(report.records.len(), 2);
        let indices: Vec<_> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(report.rejected[0].object_id.as_deref(), Some("hubble"));
        assert!(report.rejected[0].reason.starts_with("malformed record"));
        assert_eq!(report.records[1].orbit_phase, OrbitPhase::Ascending);
        assert_eq!(pipeline.stats().records_rejected, 3);
    }
}
