use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{EmissionSink, SinkError};
use crate::sample::EnrichedRecord;
use crate::window::WindowAggregate;

#[derive(Debug, Default)]
struct MemoryState {
    latest: HashMap<String, EnrichedRecord>,
    windows: VecDeque<WindowAggregate>,
}

/// Keeps the newest record per object and the last `capacity` windows.
/// Clones share the same storage, so a reader can hold one while the
/// pipeline writes through another.
#[derive(Debug, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryState>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState::default())),
            capacity,
        }
    }

    pub fn latest(&self, object_id: &str) -> Option<EnrichedRecord> {
        self.lock().latest.get(object_id).cloned()
    }

    pub fn latest_all(&self) -> Vec<EnrichedRecord> {
        let mut records: Vec<_> = self.lock().latest.values().cloned().collect();
        records.sort_by(|a, b| a.sample.object_id.cmp(&b.sample.object_id));
        records
    }

    /// Oldest first.
    pub fn windows(&self) -> Vec<WindowAggregate> {
        self.lock().windows.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EmissionSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn emit_records(&mut self, records: &[EnrichedRecord]) -> Result<(), SinkError> {
        let mut state = self.lock();
        for r in records {
            let replace = state
                .latest
                .get(&r.sample.object_id)
                .map_or(true, |current| current.sample.event_time <= r.sample.event_time);
            if replace {
                state.latest.insert(r.sample.object_id.clone(), r.clone());
            }
        }
        Ok(())
    }

    fn emit_windows(&mut self, windows: &[WindowAggregate]) -> Result<(), SinkError> {
        let capacity = self.capacity;
        let mut state = self.lock();
        for w in windows {
            state.windows.push_back(w.clone());
        }
        while state.windows.len() > capacity {
            state.windows.pop_front();
        }
        Ok(())
    }
}
