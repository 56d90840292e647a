//! Single object track for nearest-centroid tracking.

use std::collections::VecDeque;

use nalgebra::Point2;

use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Single object track.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique track identifier, never reused within one tracker run
    pub track_id: u64,
    /// State after the most recent update
    pub state: TrackState,
    /// Frames elapsed since creation, matched or not
    pub age: u32,
    /// Frames in which the track was matched to a detection
    pub hits: u32,
    /// Frames since the last successful match
    pub consecutive_misses: u32,
    /// Last matched bounding box
    pub bbox: Rect,
    /// Class label of the last matched detection
    pub class: String,
    /// Confidence of the last matched detection
    pub confidence: f64,
    /// Timestamp of the frame that created the track
    pub first_seen: f64,
    /// Timestamp of the last matched frame
    pub last_seen: f64,
    /// Index into this frame's detections, `None` when missed
    pub detection_index: Option<usize>,
    centroid_history: VecDeque<Point2<f64>>,
    history_capacity: usize,
}

impl Track {
    /// Start a track from an unmatched detection.
    pub fn new(
        track_id: u64,
        detection: &Detection,
        detection_index: usize,
        timestamp: f64,
        history_capacity: usize,
    ) -> Self {
        let history_capacity = history_capacity.max(1);
        let mut centroid_history = VecDeque::with_capacity(history_capacity);
        centroid_history.push_back(detection.centroid());

        Self {
            track_id,
            state: TrackState::New,
            age: 1,
            hits: 1,
            consecutive_misses: 0,
            bbox: detection.bbox,
            class: detection.class.clone(),
            confidence: detection.confidence,
            first_seen: timestamp,
            last_seen: timestamp,
            detection_index: Some(detection_index),
            centroid_history,
            history_capacity,
        }
    }

    /// Apply a matched detection.
    pub fn update(&mut self, detection: &Detection, detection_index: usize, timestamp: f64) {
        self.centroid_history.push_back(detection.centroid());
        while self.centroid_history.len() > self.history_capacity {
            self.centroid_history.pop_front();
        }

        self.bbox = detection.bbox;
        self.class.clone_from(&detection.class);
        self.confidence = detection.confidence;
        self.last_seen = timestamp;
        self.detection_index = Some(detection_index);

        self.hits += 1;
        self.consecutive_misses = 0;
        self.age += 1;
        self.state = TrackState::Tracked;
    }

    /// Age the track without a position update.
    pub fn mark_missed(&mut self) {
        self.detection_index = None;
        self.consecutive_misses += 1;
        self.age += 1;
        self.state = TrackState::Missed;
    }

    /// Last known centroid.
    pub fn last_centroid(&self) -> Option<Point2<f64>> {
        self.centroid_history.back().copied()
    }

    /// Centroid positions, oldest first.
    pub fn centroid_history(&self) -> impl Iterator<Item = &Point2<f64>> {
        self.centroid_history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.centroid_history.len()
    }

    pub fn is_confirmed(&self, min_hits: u32) -> bool {
        self.hits >= min_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det_at(cx: f64, cy: f64) -> Detection {
        Detection::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0, 0.9, "car")
    }

    #[test]
    fn test_new_track_counters() {
        let track = Track::new(7, &det_at(10.0, 10.0), 0, 0.0, 100);
        assert_eq!(track.track_id, 7);
        assert_eq!((track.age, track.hits, track.consecutive_misses), (1, 1, 0));
        assert_eq!(track.state, TrackState::New);
        assert_eq!(track.last_centroid(), Some(Point2::new(10.0, 10.0)));
    }

    #[test]
    fn test_update_and_miss() {
        let mut track = Track::new(1, &det_at(10.0, 10.0), 0, 0.0, 100);
        track.mark_missed();
        assert_eq!((track.age, track.hits, track.consecutive_misses), (2, 1, 1));
        assert_eq!(track.detection_index, None);
        assert_eq!(track.history_len(), 1);

        track.update(&det_at(12.0, 10.0), 3, 0.2);
        assert_eq!((track.age, track.hits, track.consecutive_misses), (3, 2, 0));
        assert_eq!(track.detection_index, Some(3));
        assert_eq!(track.last_centroid(), Some(Point2::new(12.0, 10.0)));
        assert_eq!(track.last_seen, 0.2);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut track = Track::new(1, &det_at(0.0, 0.0), 0, 0.0, 3);
        for i in 1..=4 {
            track.update(&det_at(i as f64, 0.0), 0, i as f64);
        }
        let xs: Vec<f64> = track.centroid_history().map(|p| p.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }
}
