//! Ordered frame history.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::frame::LarvaFrameData;

/// Append-only history of processed frames, iterated most recent first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameHistory {
    frames: VecDeque<LarvaFrameData>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly derived frame as the most recent one.
    pub fn push_front(&mut self, frame: LarvaFrameData) {
        self.frames.push_front(frame);
    }

    pub fn most_recent(&self) -> Option<&LarvaFrameData> {
        self.frames.front()
    }

    pub fn most_recent_mut(&mut self) -> Option<&mut LarvaFrameData> {
        self.frames.front_mut()
    }

    /// Frame `steps_back` positions before the most recent one (0 is the most recent).
    pub fn get(&self, steps_back: usize) -> Option<&LarvaFrameData> {
        self.frames.get(steps_back)
    }

    /// Most recent first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LarvaFrameData> + ExactSizeIterator {
        self.frames.iter()
    }

    /// Oldest first, the order frames were received in
    pub fn chronological(&self) -> impl Iterator<Item = &LarvaFrameData> {
        self.frames.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<'a> IntoIterator for &'a FrameHistory {
    type Item = &'a LarvaFrameData;
    type IntoIter = std::collections::vec_deque::Iter<'a, LarvaFrameData>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
