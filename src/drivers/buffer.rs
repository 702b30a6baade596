use std::collections::VecDeque;
use serde::{Deserialize, Serialize};
/// Default window size shared by every channel.
pub const MAX_POINTS: usize = 100;
/// One observation on a channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch. Non-decreasing per channel.
    pub x: i64,
    pub y: f64,
}
impl Sample {
    pub const fn new(x: i64, y: f64) -> Self {
        Self { x, y }
    }
}
/// Fixed-capacity FIFO window over a channel's samples, oldest first.
///
/// Callers must append in non-decreasing timestamp order; the buffer never
/// re-sorts. There is no interior locking: one writer per buffer.
#[derive(Clone, Debug)]
pub struct SeriesBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}
impl SeriesBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
    /// Adds `sample` at the end, evicting the single oldest sample on overflow.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }
    /// Replaces the whole window. Inputs longer than the capacity keep their tail.
    pub fn replace_all(&mut self, samples: impl IntoIterator<Item = Sample>) {
        let incoming: Vec<Sample> = samples.into_iter().collect();
        let skip = incoming.len().saturating_sub(self.capacity);
        self.samples.clear();
        self.samples.extend(incoming.into_iter().skip(skip));
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}
impl Default for SeriesBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_POINTS)
    }
}
