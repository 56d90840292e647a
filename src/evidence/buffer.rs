use std::collections::VecDeque;

/// Most-recent-N frames keyed by frame index, evicted oldest first.
///
/// Frame indices are expected to arrive in increasing order, so insertion
/// order is frame order.
#[derive(Debug, Clone)]
pub struct FrameRetentionBuffer<F> {
    frames: VecDeque<(u64, F)>,
    capacity: usize,
}

impl<F> FrameRetentionBuffer<F> {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Insert a frame, then evict the oldest while over capacity.
    pub fn record(&mut self, frame_index: u64, frame: F) {
        self.frames.push_back((frame_index, frame));
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    pub fn get(&self, frame_index: u64) -> Option<&F> {
        self.frames
            .iter()
            .rev()
            .find(|(i, _)| *i == frame_index)
            .map(|(_, f)| f)
    }

    pub fn contains(&self, frame_index: u64) -> bool {
        self.get(frame_index).is_some()
    }

    /// Resident frame indices, oldest first.
    pub fn indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.frames.iter().map(|(i, _)| *i)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
