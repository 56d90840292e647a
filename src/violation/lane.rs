//! Lane-boundary violation scoring, the alternate mode to zone checks.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::tracker::Rect;

/// Horizontal extent of one lane at the vehicle's depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneBoundary {
    pub left: f64,
    pub right: f64,
}

impl LaneBoundary {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn contains_x(&self, x: f64) -> bool {
        self.left <= x && x <= self.right
    }
}

/// Fraction of the box width lying outside every lane, in [0, 1].
///
/// The width is sampled at one point per pixel. No lanes means no violation.
pub fn lane_violation_score(bbox: &Rect, boundaries: &[LaneBoundary]) -> f64 {
    if boundaries.is_empty() {
        return 0.0;
    }
    let [x1, _, x2, _] = bbox.to_tlbr();
    let samples = (x2 - x1).max(0.0) as usize;
    if samples == 0 {
        return 0.0;
    }

    let outside = Array1::linspace(x1, x2, samples)
        .iter()
        .filter(|&&x| !boundaries.iter().any(|b| b.contains_x(x)))
        .count();

    (outside as f64 / samples as f64).min(1.0)
}

/// Exponential moving average over lane boundary positions.
///
/// A change in the number of lanes restarts the average from the new
/// observation.
#[derive(Debug, Clone)]
pub struct LaneSmoother {
    alpha: f64,
    state: Vec<LaneBoundary>,
}

impl Default for LaneSmoother {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl LaneSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: Vec::new(),
        }
    }

    pub fn smooth(&mut self, observed: &[LaneBoundary]) -> &[LaneBoundary] {
        if self.state.len() != observed.len() {
            self.state = observed.to_vec();
            return &self.state;
        }
        let a = self.alpha;
        for (s, o) in self.state.iter_mut().zip(observed) {
            s.left = a * o.left + (1.0 - a) * s.left;
            s.right = a * o.right + (1.0 - a) * s.right;
        }
        &self.state
    }

    pub fn current(&self) -> &[LaneBoundary] {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }
}
