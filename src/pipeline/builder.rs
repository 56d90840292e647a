//! Builder for creating Detection objects from various input formats.

use crate::tracker::Detection;

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    class: String,
    track_id: Option<u64>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f64, cy: f64, w: f64, h: f64) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, l: f64, t: f64, w: f64, h: f64) -> Self {
        self.x1 = l;
        self.y1 = t;
        self.x2 = l + w;
        self.y2 = t + h;
        self
    }

    /// Set the confidence score.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the class label.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Set the identity assigned by an upstream tracker.
    pub fn track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        let mut det = Detection::new(
            self.x1,
            self.y1,
            self.x2,
            self.y2,
            self.confidence,
            self.class,
        );
        det.track_id = self.track_id;
        det
    }
}
