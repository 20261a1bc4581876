use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sample::PositionSample;

/// Last raw sample seen per tracked object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    last: HashMap<String, PositionSample>,
}

impl SequencerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self, object_id: &str) -> Option<&PositionSample> {
        self.last.get(object_id)
    }

    /// Replace the stored sample for `sample.object_id`, returning the old one.
    pub fn record(&mut self, sample: PositionSample) -> Option<PositionSample> {
        self.last.insert(sample.object_id.clone(), sample)
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.last.keys().map(String::as_str)
    }
}
