//! Matching utilities for nearest-centroid tracking.

use nalgebra::Point2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracker::rect::Rect;

/// Detection input for the tracker, as produced by the external detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box, built from TLBR format (x1, y1, x2, y2)
    pub bbox: Rect,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    /// Class label, e.g. "car" or "truck"
    pub class: String,
    /// Identity persisted by the detector itself, if it tracks
    #[serde(default)]
    pub track_id: Option<u64>,
}

impl Detection {
    pub fn new(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        confidence: f64,
        class: impl Into<String>,
    ) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            confidence,
            class: class.into(),
            track_id: None,
        }
    }

    pub fn from_rect(bbox: Rect, confidence: f64, class: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class: class.into(),
            track_id: None,
        }
    }

    pub fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }

    /// Box centroid, used for identity association.
    pub fn centroid(&self) -> Point2<f64> {
        self.bbox.center()
    }

    /// Bottom-center of the box, used for zone and lane occupancy.
    pub fn ground_point(&self) -> Point2<f64> {
        self.bbox.bottom_center()
    }

    /// Reject boxes that are not ordered x1 < x2, y1 < y2.
    pub fn validate(&self) -> Result<()> {
        if self.bbox.is_valid() {
            Ok(())
        } else {
            let [x1, y1, x2, y2] = self.bbox.to_tlbr();
            Err(Error::InvalidBox { x1, y1, x2, y2 })
        }
    }
}

/// Euclidean distance matrix between track centroids and detection centroids.
pub fn centroid_distance(track_points: &[Point2<f64>], det_points: &[Point2<f64>]) -> Array2<f64> {
    let mut dists = Array2::zeros((track_points.len(), det_points.len()));
    for (i, t) in track_points.iter().enumerate() {
        for (j, d) in det_points.iter().enumerate() {
            dists[[i, j]] = nalgebra::distance(t, d);
        }
    }
    dists
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Greedy per-row assignment.
///
/// Rows are visited in order; each row takes the closest column not already
/// taken whose cost is strictly below `max_cost`. Equal costs keep the lowest
/// column index. This is not a globally optimal assignment.
pub fn greedy_assignment(cost_matrix: &Array2<f64>, max_cost: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    let mut used = vec![false; num_cols];
    let mut matches = Vec::new();
    let mut unmatched_tracks = Vec::new();

    for row in 0..num_rows {
        let mut best: Option<(usize, f64)> = None;
        for col in 0..num_cols {
            if used[col] {
                continue;
            }
            let cost = cost_matrix[[row, col]];
            let bound = best.map_or(max_cost, |(_, c)| c);
            if cost < bound {
                best = Some((col, cost));
            }
        }

        match best {
            Some((col, _)) => {
                used[col] = true;
                matches.push((row, col));
            }
            None => unmatched_tracks.push(row),
        }
    }

    let unmatched_detections = used
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { None } else { Some(i) })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
