use lane_violation_rs::{
    CentroidTracker, Detection, TrackKey, TrackerConfig, ViolationEngine, ZoneDefinition, ZoneStore,
};
use proptest::prelude::*;

fn detection(cx: f64, cy: f64, class: &str) -> Detection {
    Detection::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0, 0.9, class)
}

fn frames() -> impl Strategy<Value = Vec<Vec<(f64, f64)>>> {
    prop::collection::vec(
        prop::collection::vec((0.0..640.0f64, 0.0..480.0f64), 0..6),
        1..40,
    )
}

proptest! {
    #[test]
    fn hits_never_exceed_age(frames in frames()) {
        let mut tracker = CentroidTracker::new(TrackerConfig {
            max_age: 5,
            max_distance: 60.0,
            ..TrackerConfig::default()
        });
        for (i, points) in frames.iter().enumerate() {
            let dets: Vec<_> = points.iter().map(|&(x, y)| detection(x, y, "car")).collect();
            for track in tracker.update(&dets, i as f64) {
                prop_assert!(track.hits <= track.age);
                prop_assert!(track.age <= 5);
                prop_assert!(track.history_len() >= 1);
            }
        }
    }

    #[test]
    fn track_ids_are_unique(frames in frames()) {
        let mut tracker = CentroidTracker::new(TrackerConfig::default());
        for (i, points) in frames.iter().enumerate() {
            let dets: Vec<_> = points.iter().map(|&(x, y)| detection(x, y, "car")).collect();
            let tracks = tracker.update(&dets, i as f64);
            let mut ids: Vec<_> = tracks.iter().map(|t| t.track_id).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), tracks.len());
        }
    }

    #[test]
    fn rescale_round_trip_restores_polygon(
        w in 1u32..4000,
        h in 1u32..4000,
        x in 0.0..100.0f64,
        y in 0.0..100.0f64,
    ) {
        let mut zones = ZoneStore::from_definitions([ZoneDefinition::new(
            "z",
            "Zone",
            &[(x, y), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
            &["car"],
        )
        .with_reference_canvas(100, 100)])
        .unwrap();
        let original = zones.get("z").unwrap().polygon().vertices().to_vec();

        zones.rescale(w, h);
        zones.rescale(100, 100);

        let restored = zones.get("z").unwrap().polygon().vertices();
        for (a, b) in original.iter().zip(restored) {
            prop_assert!((a.x - b.x).abs() < 1e-9);
            prop_assert!((a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn streak_resets_after_clean_frame(pattern in prop::collection::vec(any::<bool>(), 1..50)) {
        let zones = ZoneStore::from_definitions([ZoneDefinition::new(
            "z",
            "Zone",
            &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
            &["car"],
        )])
        .unwrap();
        let mut engine = ViolationEngine::default();
        let mut expected = 0u32;

        for (frame, violating) in pattern.into_iter().enumerate() {
            let class = if violating { "truck" } else { "car" };
            let status = engine
                .evaluate(&zones, &detection(50.0, 45.0, class), TrackKey::Tracked(1), &[], frame as u64)
                .unwrap();
            expected = if violating { expected + 1 } else { 0 };
            prop_assert_eq!(status.consecutive_count, expected);
            prop_assert_eq!(status.first_violation_frame.is_some(), expected > 0);
            prop_assert_eq!(status.is_confirmed(3), expected >= 3);
        }
    }
}
