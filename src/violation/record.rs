use std::fmt;

use serde::Serialize;

use crate::tracker::Rect;

/// Identity a violation history is kept under.
///
/// Detections without an identity all share the `Untracked` bucket, so their
/// streaks blend together; this is an approximation for when upstream
/// identity assignment fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum TrackKey {
    Tracked(u64),
    Untracked,
}

impl From<Option<u64>> for TrackKey {
    fn from(id: Option<u64>) -> Self {
        id.map_or(TrackKey::Untracked, TrackKey::Tracked)
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Tracked(id) => write!(f, "{id}"),
            TrackKey::Untracked => f.write_str("untracked"),
        }
    }
}

/// Per-track violation bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViolationRecord {
    /// Length of the current unbroken violation streak
    pub consecutive_violations: u32,
    /// Lifetime count of violating frames
    pub total_violations: u32,
    /// Frame index where the current streak started
    pub first_violation_frame: Option<u64>,
    /// Box observed on `first_violation_frame`
    pub first_violation_bbox: Option<Rect>,
    /// Frame index of the latest observation, violating or not
    pub last_observed_frame: Option<u64>,
}

impl ViolationRecord {
    pub(crate) fn observe(&mut self, violating: bool, frame_index: u64, bbox: Rect) {
        self.last_observed_frame = Some(frame_index);
        if violating {
            if self.consecutive_violations == 0 {
                self.first_violation_frame = Some(frame_index);
                self.first_violation_bbox = Some(bbox);
            }
            self.consecutive_violations += 1;
            self.total_violations += 1;
        } else {
            self.break_streak();
        }
    }

    /// End the current streak without counting an observation.
    pub(crate) fn break_streak(&mut self) {
        self.consecutive_violations = 0;
        self.first_violation_frame = None;
        self.first_violation_bbox = None;
    }

    pub fn is_confirmed(&self, threshold: u32) -> bool {
        self.consecutive_violations > 0 && self.consecutive_violations >= threshold
    }
}
