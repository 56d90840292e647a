//! Violation engine: per-track streak bookkeeping over zone or lane checks.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::tracker::{Detection, Rect};
use crate::violation::lane::{LaneBoundary, lane_violation_score};
use crate::violation::record::{TrackKey, ViolationRecord};
use crate::zone::ZoneStore;

/// Outcome of evaluating one detection on one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationStatus {
    pub track: TrackKey,
    pub is_violating: bool,
    pub consecutive_count: u32,
    pub total_count: u32,
    pub first_violation_frame: Option<u64>,
    /// Zones whose allow-list the vehicle broke this frame
    pub violated_zones: Vec<String>,
    /// Fraction outside the lanes, lane mode only
    pub lane_score: Option<f64>,
}

impl ViolationStatus {
    /// Confirmation is derived, not stored: a streak at least `threshold` long.
    pub fn is_confirmed(&self, threshold: u32) -> bool {
        self.is_violating && self.consecutive_count >= threshold
    }
}

/// Owns the violation history of one processing job.
#[derive(Debug, Clone)]
pub struct ViolationEngine {
    records: HashMap<TrackKey, ViolationRecord>,
    lane_threshold: f64,
}

impl Default for ViolationEngine {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl ViolationEngine {
    /// `lane_threshold` is the lane score above which a vehicle violates in lane mode.
    pub fn new(lane_threshold: f64) -> Self {
        Self {
            records: HashMap::new(),
            lane_threshold,
        }
    }

    /// Zone evaluation: the ground point of the detection is tested against
    /// `zone_ids` (every zone when empty). Being inside any of them while
    /// the class is not allowed there is a violation.
    pub fn evaluate(
        &mut self,
        zones: &ZoneStore,
        detection: &Detection,
        track: TrackKey,
        zone_ids: &[String],
        frame_index: u64,
    ) -> Result<ViolationStatus> {
        let check = zones.check_violation(&detection.ground_point(), &detection.class, zone_ids)?;
        let violating = check.is_violating();
        let record = self.observe(track, violating, frame_index, detection.bbox);

        Ok(status(track, record, violating, check.violated, None))
    }

    /// Lane evaluation: the vehicle violates when more than the configured
    /// fraction of its width lies outside every lane.
    pub fn evaluate_lane(
        &mut self,
        detection: &Detection,
        track: TrackKey,
        boundaries: &[LaneBoundary],
        frame_index: u64,
    ) -> ViolationStatus {
        let score = lane_violation_score(&detection.bbox, boundaries);
        let violating = score > self.lane_threshold;
        let record = self.observe(track, violating, frame_index, detection.bbox);

        status(track, record, violating, Vec::new(), Some(score))
    }

    fn observe(
        &mut self,
        track: TrackKey,
        violating: bool,
        frame_index: u64,
        bbox: Rect,
    ) -> &ViolationRecord {
        let record = self.records.entry(track).or_default();
        record.observe(violating, frame_index, bbox);
        record
    }

    pub fn is_confirmed(&self, track: TrackKey, threshold: u32) -> bool {
        self.records
            .get(&track)
            .is_some_and(|r| r.is_confirmed(threshold))
    }

    pub fn record(&self, track: TrackKey) -> Option<&ViolationRecord> {
        self.records.get(&track)
    }

    pub fn records(&self) -> impl Iterator<Item = (&TrackKey, &ViolationRecord)> {
        self.records.iter()
    }

    /// Break the streak of every identity not in `observed`.
    ///
    /// A vehicle that was not evaluated on this frame cannot extend a run
    /// of consecutive violations. Returns how many streaks were broken.
    pub fn break_unobserved(&mut self, observed: &HashSet<TrackKey>) -> usize {
        let mut broken = 0;
        for (key, record) in &mut self.records {
            if record.consecutive_violations > 0 && !observed.contains(key) {
                record.break_streak();
                broken += 1;
            }
        }
        if broken > 0 {
            debug!(broken, "streaks broken by unobserved vehicles");
        }
        broken
    }

    /// Drop the histories that are not mid-streak, and any not observed
    /// within `max_age` frames of `current_frame`. Returns how many went.
    pub fn cleanup(&mut self, max_age: u64, current_frame: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| {
            let recent = r
                .last_observed_frame
                .is_some_and(|last| current_frame.saturating_sub(last) <= max_age);
            r.consecutive_violations > 0 && recent
        });
        let removed = before - self.records.len();
        if removed > 0 {
            debug!(removed, kept = self.records.len(), "cleaned up violation history");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }
}

fn status(
    track: TrackKey,
    record: &ViolationRecord,
    violating: bool,
    violated_zones: Vec<String>,
    lane_score: Option<f64>,
) -> ViolationStatus {
    ViolationStatus {
        track,
        is_violating: violating,
        consecutive_count: record.consecutive_violations,
        total_count: record.total_violations,
        first_violation_frame: record.first_violation_frame,
        violated_zones,
        lane_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::ZoneDefinition;

    fn zones() -> ZoneStore {
        ZoneStore::from_definitions([ZoneDefinition::new(
            "z1",
            "Car lane",
            &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
            &["car"],
        )
        .with_reference_canvas(100, 100)])
        .unwrap()
    }

    /// Box whose bottom-center sits at (x, y).
    fn vehicle(class: &str, x: f64, y: f64) -> Detection {
        Detection::new(x - 10.0, y - 20.0, x + 10.0, y, 0.9, class)
    }

    #[test]
    fn test_truck_in_car_zone_confirms_on_third_frame() {
        let zones = zones();
        let mut engine = ViolationEngine::default();
        let key = TrackKey::Tracked(1);
        let selected = vec!["z1".to_string()];

        for frame in 1..=3 {
            let status = engine
                .evaluate(&zones, &vehicle("truck", 50.0, 50.0), key, &selected, frame)
                .unwrap();
            assert!(status.is_violating);
            assert_eq!(status.consecutive_count, frame as u32);
            assert_eq!(status.violated_zones, vec!["z1"]);
            assert_eq!(status.is_confirmed(3), frame == 3);
        }

        let record = engine.record(key).unwrap();
        assert_eq!(record.total_violations, 3);
        assert_eq!(record.first_violation_frame, Some(1));
        assert!(engine.is_confirmed(key, 3));
    }

    #[test]
    fn test_allowed_class_is_not_violating() {
        let mut engine = ViolationEngine::default();
        let status = engine
            .evaluate(&zones(), &vehicle("car", 50.0, 50.0), TrackKey::Tracked(1), &[], 0)
            .unwrap();
        assert!(!status.is_violating);
        assert_eq!(status.total_count, 0);
    }

    #[test]
    fn test_ground_point_decides_membership() {
        let mut engine = ViolationEngine::default();
        // Box centroid (50, 90) is inside, bottom-center (50, 130) is not.
        let det = Detection::new(40.0, 50.0, 60.0, 130.0, 0.9, "truck");
        let status = engine
            .evaluate(&zones(), &det, TrackKey::Tracked(1), &[], 0)
            .unwrap();
        assert!(!status.is_violating);
    }

    #[test]
    fn test_streak_resets_immediately() {
        let zones = zones();
        let mut engine = ViolationEngine::default();
        let key = TrackKey::Tracked(7);

        engine.evaluate(&zones, &vehicle("truck", 50.0, 50.0), key, &[], 10).unwrap();
        engine.evaluate(&zones, &vehicle("truck", 50.0, 50.0), key, &[], 11).unwrap();
        let status = engine
            .evaluate(&zones, &vehicle("truck", 500.0, 50.0), key, &[], 12)
            .unwrap();
        assert_eq!(status.consecutive_count, 0);
        assert_eq!(status.total_count, 2);
        assert_eq!(status.first_violation_frame, None);

        let status = engine
            .evaluate(&zones, &vehicle("truck", 50.0, 50.0), key, &[], 13)
            .unwrap();
        assert_eq!(status.consecutive_count, 1);
        assert_eq!(status.first_violation_frame, Some(13));
    }

    #[test]
    fn test_unknown_selected_zone_is_error() {
        let mut engine = ViolationEngine::default();
        let result = engine.evaluate(
            &zones(),
            &vehicle("truck", 50.0, 50.0),
            TrackKey::Tracked(1),
            &["missing".to_string()],
            0,
        );
        assert!(result.is_err());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_untracked_detections_share_a_bucket() {
        let zones = zones();
        let mut engine = ViolationEngine::default();
        engine
            .evaluate(&zones, &vehicle("truck", 20.0, 50.0), TrackKey::Untracked, &[], 0)
            .unwrap();
        let status = engine
            .evaluate(&zones, &vehicle("bus", 80.0, 50.0), TrackKey::Untracked, &[], 0)
            .unwrap();
        assert_eq!(status.consecutive_count, 2);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_cleanup_keeps_active_streaks() {
        let zones = zones();
        let mut engine = ViolationEngine::default();
        engine
            .evaluate(&zones, &vehicle("truck", 50.0, 50.0), TrackKey::Tracked(1), &[], 0)
            .unwrap();
        engine
            .evaluate(&zones, &vehicle("car", 50.0, 50.0), TrackKey::Tracked(2), &[], 0)
            .unwrap();

        assert_eq!(engine.cleanup(30, 0), 1);
        assert!(engine.record(TrackKey::Tracked(1)).is_some());
        assert!(engine.record(TrackKey::Tracked(2)).is_none());
    }

    #[test]
    fn test_cleanup_drops_stale_streaks() {
        let zones = zones();
        let mut engine = ViolationEngine::default();
        engine
            .evaluate(&zones, &vehicle("truck", 50.0, 50.0), TrackKey::Tracked(1), &[], 0)
            .unwrap();
        engine
            .evaluate(&zones, &vehicle("truck", 50.0, 50.0), TrackKey::Tracked(2), &[], 8)
            .unwrap();

        // Track 1 is mid-streak but has not been seen for 10 frames
        assert_eq!(engine.cleanup(5, 10), 1);
        assert!(engine.record(TrackKey::Tracked(1)).is_none());
        assert!(engine.record(TrackKey::Tracked(2)).is_some());
    }

    #[test]
    fn test_unobserved_streaks_break() {
        let zones = zones();
        let mut engine = ViolationEngine::default();
        for frame in 0..2 {
            for id in [1, 2] {
                engine
                    .evaluate(&zones, &vehicle("truck", 50.0, 50.0), TrackKey::Tracked(id), &[], frame)
                    .unwrap();
            }
        }

        // Frame 2: only track 2 is seen
        let observed = HashSet::from([TrackKey::Tracked(2)]);
        assert_eq!(engine.break_unobserved(&observed), 1);
        let gone = engine.record(TrackKey::Tracked(1)).unwrap();
        assert_eq!(gone.consecutive_violations, 0);
        assert_eq!(gone.total_violations, 2);
        assert_eq!(gone.first_violation_frame, None);
        assert_eq!(engine.record(TrackKey::Tracked(2)).unwrap().consecutive_violations, 2);

        // Back on frame 3: a fresh streak, not the third in a row
        let status = engine
            .evaluate(&zones, &vehicle("truck", 50.0, 50.0), TrackKey::Tracked(1), &[], 3)
            .unwrap();
        assert_eq!(status.consecutive_count, 1);
        assert!(!status.is_confirmed(3));
    }

    #[test]
    fn test_lane_mode() {
        let mut engine = ViolationEngine::new(0.3);
        let lanes = [LaneBoundary::new(0.0, 100.0)];
        let key = TrackKey::Tracked(1);

        let inside = Detection::new(10.0, 0.0, 90.0, 40.0, 0.9, "car");
        let status = engine.evaluate_lane(&inside, key, &lanes, 0);
        assert!(!status.is_violating);
        assert_eq!(status.lane_score, Some(0.0));

        let straddling = Detection::new(50.0, 0.0, 150.0, 40.0, 0.9, "car");
        let status = engine.evaluate_lane(&straddling, key, &lanes, 1);
        assert!(status.is_violating);
        assert_eq!(status.consecutive_count, 1);
        assert_eq!(status.first_violation_frame, Some(1));
    }
}
