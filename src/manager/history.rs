use std::collections::VecDeque;

use crate::info::ContainerStatsSample;

/// Samples allocated up front; larger histories grow on demand.
const PREALLOCATED_SAMPLES: usize = 64;

/// Fixed-capacity FIFO of stats samples, oldest first.
///
/// Pushing onto a full history evicts the oldest sample before appending, so
/// `len() <= capacity()` always holds.
#[derive(Debug, Clone)]
pub struct StatsHistory {
    samples: VecDeque<ContainerStatsSample>,
    capacity: usize,
}

impl StatsHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATED_SAMPLES)),
            capacity,
        }
    }

    /// Appends `sample` at the newest end, returning the evicted sample if the
    /// history was full.
    pub fn push(&mut self, sample: ContainerStatsSample) -> Option<ContainerStatsSample> {
        if self.capacity == 0 {
            return Some(sample);
        }
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerStatsSample> {
        self.samples.iter()
    }

    /// Copies the retained samples, oldest first.
    pub fn to_vec(&self) -> Vec<ContainerStatsSample> {
        self.samples.iter().cloned().collect()
    }
}
