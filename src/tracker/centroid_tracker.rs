//! Nearest-centroid tracker.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::track::Track;

/// Configuration for the CentroidTracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum centroid distance in pixels for a detection to continue a track
    pub max_distance: f64,
    /// Tracks whose age exceeds this many frames are evicted
    pub max_age: u32,
    /// Hits required before a track is active
    pub min_hits: u32,
    /// Number of centroid positions kept per track
    pub history_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_distance: 100.0,
            max_age: 30,
            min_hits: 3,
            history_capacity: 100,
        }
    }
}

/// Assigns persistent identities to per-frame detections.
///
/// Association is greedy: every live track, in creation order, claims the
/// closest unused detection within `max_distance`. There is no motion model.
pub struct CentroidTracker {
    tracks: Vec<Track>,
    next_id: u64,
    frame_id: u64,
    config: TrackerConfig,
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
            config,
        }
    }

    /// Feed one frame of detections and return the live tracks.
    ///
    /// Passing an empty slice ages every track, which is how frames whose
    /// detection failed keep the tracker state consistent.
    pub fn update(&mut self, detections: &[Detection], timestamp: f64) -> &[Track] {
        self.frame_id += 1;

        // Step 1: Tracks still within max_age compete for detections
        let pool: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.age <= self.config.max_age && t.last_centroid().is_some())
            .map(|(i, _)| i)
            .collect();

        let pool_points: Vec<_> = pool
            .iter()
            .filter_map(|&i| self.tracks[i].last_centroid())
            .collect();
        let det_points: Vec<_> = detections.iter().map(Detection::centroid).collect();
        let dists = matching::centroid_distance(&pool_points, &det_points);

        let AssignmentResult {
            matches,
            unmatched_detections,
            ..
        } = matching::greedy_assignment(&dists, self.config.max_distance);

        // Step 2: Matched tracks take the detection, everything else ages
        let mut matched = vec![None; self.tracks.len()];
        for (ipool, idet) in matches {
            matched[pool[ipool]] = Some(idet);
        }

        for (track, det) in self.tracks.iter_mut().zip(matched) {
            match det {
                Some(idet) => track.update(&detections[idet], idet, timestamp),
                None => track.mark_missed(),
            }
        }

        // Step 3: Unmatched detections start new tracks
        for idet in unmatched_detections {
            let track = Track::new(
                self.next_id,
                &detections[idet],
                idet,
                timestamp,
                self.config.history_capacity,
            );
            self.next_id += 1;
            self.tracks.push(track);
        }

        // Step 4: Evict tracks past max_age
        let before = self.tracks.len();
        let max_age = self.config.max_age;
        self.tracks.retain(|t| t.age <= max_age);
        if self.tracks.len() < before {
            debug!(
                frame = self.frame_id,
                evicted = before - self.tracks.len(),
                live = self.tracks.len(),
                "evicted aged tracks"
            );
        }

        &self.tracks
    }

    /// Tracks with enough hits to be eligible for violation checks.
    pub fn active_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| t.is_confirmed(self.config.min_hits) && t.age <= self.config.max_age)
    }

    /// Live track matched to detection `index` in the last update.
    pub fn track_for_detection(&self, index: usize) -> Option<&Track> {
        self.tracks.iter().find(|t| t.detection_index == Some(index))
    }

    pub fn track(&self, track_id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of update calls since creation or the last reset.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Drop all tracks and restart the id sequence at 1.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
        self.frame_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TrackState;

    fn det_at(cx: f64, cy: f64) -> Detection {
        Detection::new(cx - 10.0, cy - 10.0, cx + 10.0, cy + 10.0, 0.9, "car")
    }

    fn config(max_age: u32, min_hits: u32) -> TrackerConfig {
        TrackerConfig {
            max_age,
            min_hits,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_identity_persists() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());

        let tracks = tracker.update(&[det_at(100.0, 100.0)], 0.0);
        assert_eq!(tracks.len(), 1);
        let id = tracks[0].track_id;
        assert_eq!(id, 1);

        let tracks = tracker.update(&[det_at(110.0, 105.0)], 0.1);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, id);
        assert_eq!(tracks[0].hits, 2);
        assert_eq!(tracks[0].state, TrackState::Tracked);
    }

    #[test]
    fn test_far_detection_spawns_new_track() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        tracker.update(&[det_at(100.0, 100.0)], 0.0);
        let tracks = tracker.update(&[det_at(400.0, 400.0)], 0.1);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].state, TrackState::Missed);
        assert_eq!(tracks[0].consecutive_misses, 1);
        assert_eq!(tracks[1].track_id, 2);
        assert_eq!((tracks[1].age, tracks[1].hits), (1, 1));
    }

    #[test]
    fn test_min_hits_gates_active_tracks() {
        let mut tracker = CentroidTracker::new(config(30, 3));
        tracker.update(&[det_at(50.0, 50.0)], 0.0);
        assert_eq!(tracker.active_tracks().count(), 0);
        tracker.update(&[det_at(52.0, 50.0)], 0.1);
        assert_eq!(tracker.active_tracks().count(), 0);
        tracker.update(&[det_at(54.0, 50.0)], 0.2);
        assert_eq!(tracker.active_tracks().count(), 1);
    }

    #[test]
    fn test_unmatched_track_is_evicted_after_max_age() {
        let max_age = 5;
        let mut tracker = CentroidTracker::new(config(max_age, 1));
        tracker.update(&[det_at(50.0, 50.0)], 0.0);

        for _ in 0..max_age - 1 {
            tracker.update(&[], 0.0);
        }
        assert_eq!(tracker.tracks().len(), 1);
        assert_eq!(tracker.tracks()[0].age, max_age);

        tracker.update(&[], 0.0);
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn test_track_for_detection() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        tracker.update(&[det_at(10.0, 10.0), det_at(500.0, 10.0)], 0.0);
        tracker.update(&[det_at(505.0, 12.0), det_at(12.0, 10.0)], 0.1);

        assert_eq!(tracker.track_for_detection(0).map(|t| t.track_id), Some(2));
        assert_eq!(tracker.track_for_detection(1).map(|t| t.track_id), Some(1));
        assert!(tracker.track_for_detection(2).is_none());
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        tracker.update(&[det_at(10.0, 10.0), det_at(500.0, 10.0)], 0.0);
        tracker.reset();
        assert!(tracker.tracks().is_empty());

        let tracks = tracker.update(&[det_at(10.0, 10.0)], 0.0);
        assert_eq!(tracks[0].track_id, 1);
    }
}
