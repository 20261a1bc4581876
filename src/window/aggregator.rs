use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::EnrichedRecord;

use super::accumulator::WindowAccumulator;
use super::error::WindowError;
use super::types::{Window, WindowAggregate};

pub type WindowResult = Result<WindowAggregate, WindowError>;

/// Lifecycle of a window key. Closed slots are kept as tombstones so a late
/// record hitting a finished window is an explicit transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WindowSlot {
    Open(WindowAccumulator),
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    /// Windows closed because this record advanced the watermark.
    pub closed: Vec<WindowResult>,
    /// The record was behind the watermark and was dropped.
    pub late: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorSnapshot {
    pub window_ms: i64,
    pub max_event_time: Option<DateTime<Utc>>,
    pub slots: Vec<(DateTime<Utc>, WindowSlot)>,
}

/// Tumbling event-time windows closed by a watermark trailing the newest
/// event time by `allowed_lateness`.
pub struct WindowAggregator {
    duration: Duration,
    allowed_lateness: Duration,
    track_position: bool,
    closed_retention: usize,
    slots: BTreeMap<DateTime<Utc>, WindowSlot>,
    max_event_time: Option<DateTime<Utc>>,
}

impl WindowAggregator {
    pub fn new(
        duration: Duration,
        allowed_lateness: Duration,
        track_position: bool,
        closed_retention: usize,
    ) -> Result<Self, WindowError> {
        if duration <= Duration::zero()
            || duration != Duration::milliseconds(duration.num_milliseconds())
        {
            return Err(WindowError::InvalidDuration);
        }
        Ok(Self {
            duration,
            allowed_lateness: allowed_lateness.max(Duration::zero()),
            track_position,
            closed_retention,
            slots: BTreeMap::new(),
            max_event_time: None,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Event time below which windows are considered complete.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.max_event_time.map(|t| {
            t.checked_sub_signed(self.allowed_lateness)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
    }

    /// The window `t` falls into. Fails when the window bounds or the
    /// watermark derived from `t` cannot be represented.
    pub fn window_for(&self, t: DateTime<Utc>) -> Result<Window, WindowError> {
        Window::containing(t, self.duration)
            .filter(|_| t.checked_sub_signed(self.allowed_lateness).is_some())
            .ok_or(WindowError::OutOfRange(t))
    }

    pub fn open_windows(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, WindowSlot::Open(_)))
            .count()
    }

    pub fn slot(&self, start: DateTime<Utc>) -> Option<&WindowSlot> {
        self.slots.get(&start)
    }

    /// Errors leave the aggregator untouched.
    pub fn ingest(&mut self, record: &EnrichedRecord) -> Result<IngestOutcome, WindowError> {
        let t = record.event_time();
        let window = self.window_for(t)?;

        if self.is_late(&window) {
            log::debug!(
                "Dropping late record for {} at {} (window {} already closed)",
                record.object_id(),
                t,
                window.start
            );
            return Ok(IngestOutcome {
                closed: Vec::new(),
                late: true,
            });
        }

        match self.slots.get_mut(&window.start) {
            Some(WindowSlot::Open(acc)) => acc.observe(record),
            // `is_late` covers tombstones
            Some(WindowSlot::Closed) => {}
            None => {
                self.slots.insert(
                    window.start,
                    WindowSlot::Open(WindowAccumulator::from_first(record, self.track_position)),
                );
            }
        }

        self.max_event_time = Some(self.max_event_time.map_or(t, |m| m.max(t)));

        Ok(IngestOutcome {
            closed: self.close_eligible(),
            late: false,
        })
    }

    /// Move the watermark forward without a record (idle timer).
    pub fn advance_to(&mut self, event_time: DateTime<Utc>) -> Vec<WindowResult> {
        self.max_event_time = Some(self.max_event_time.map_or(event_time, |m| m.max(event_time)));
        self.close_eligible()
    }

    /// Close every open window regardless of the watermark (end of stream).
    pub fn flush(&mut self) -> Vec<WindowResult> {
        let starts: Vec<_> = self.open_starts().collect();
        self.close(starts)
    }

    pub fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            window_ms: self.duration.num_milliseconds(),
            max_event_time: self.max_event_time,
            slots: self
                .slots
                .iter()
                .map(|(start, slot)| (*start, slot.clone()))
                .collect(),
        }
    }

    /// Returns false (and leaves state alone) when the snapshot was taken
    /// with a different window length. Position sums are dropped when this
    /// aggregator does not track positions; windows opened without them keep
    /// reporting no average position.
    pub fn restore(&mut self, snapshot: AggregatorSnapshot) -> bool {
        if snapshot.window_ms != self.duration.num_milliseconds() {
            return false;
        }
        self.max_event_time = snapshot.max_event_time;
        self.slots = snapshot.slots.into_iter().collect();
        if !self.track_position {
            for slot in self.slots.values_mut() {
                if let WindowSlot::Open(acc) = slot {
                    acc.position = None;
                }
            }
        }
        true
    }

    fn is_late(&self, window: &Window) -> bool {
        if matches!(self.slots.get(&window.start), Some(WindowSlot::Closed)) {
            return true;
        }
        self.watermark().is_some_and(|w| window.end <= w)
    }

    fn open_starts(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.slots.iter().filter_map(|(start, slot)| match slot {
            WindowSlot::Open(_) => Some(*start),
            WindowSlot::Closed => None,
        })
    }

    fn close_eligible(&mut self) -> Vec<WindowResult> {
        let Some(watermark) = self.watermark() else {
            return Vec::new();
        };
        let duration = self.duration;
        let starts: Vec<_> = self
            .open_starts()
            .filter(|start| {
                start
                    .checked_add_signed(duration)
                    .is_some_and(|end| end <= watermark)
            })
            .collect();
        self.close(starts)
    }

    fn close(&mut self, starts: Vec<DateTime<Utc>>) -> Vec<WindowResult> {
        let mut results = Vec::with_capacity(starts.len());
        for start in starts {
            let Some(WindowSlot::Open(acc)) = self.slots.insert(start, WindowSlot::Closed) else {
                continue;
            };
            match start.checked_add_signed(self.duration) {
                Some(end) => results.push(acc.finalize(Window { start, end })),
                None => results.push(Err(WindowError::OutOfRange(start))),
            }
        }
        self.prune_tombstones();
        results
    }

    fn prune_tombstones(&mut self) {
        let closed: Vec<_> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, WindowSlot::Closed))
            .map(|(start, _)| *start)
            .collect();
        let excess = closed.len().saturating_sub(self.closed_retention);
        for start in closed.into_iter().take(excess) {
            self.slots.remove(&start);
        }
    }
}
