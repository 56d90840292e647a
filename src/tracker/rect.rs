use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Bounding box representation with format conversion utilities.
///
/// Stored as TLWH (top-left x, top-left y, width, height) in pixel space.
/// Detectors hand boxes over in TLBR form (x1, y1, x2, y2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f64,
    /// Top-left y coordinate
    pub y: f64,
    /// Width of the bounding box
    pub width: f64,
    /// Height of the bounding box
    pub height: f64,
}

/// Integer pixel region inside a frame, as used for cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Ground-contact point: horizontal center of the bottom edge.
    ///
    /// For vehicles seen from a road camera this is where the wheels meet the
    /// road, which is what lane and zone occupancy should be judged on.
    #[inline]
    pub fn bottom_center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height)
    }

    /// True when the box has positive width and height and finite coordinates.
    pub fn is_valid(&self) -> bool {
        self.to_tlwh().iter().all(|v| v.is_finite()) && self.width > 0.0 && self.height > 0.0
    }

    /// Grow the box by `fraction` of its own width/height on every side.
    pub fn padded(&self, fraction: f64) -> Self {
        let dx = self.width * fraction;
        let dy = self.height * fraction;
        Self::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }

    /// Clamp to a `frame_width` x `frame_height` frame and snap to whole pixels.
    ///
    /// Returns `None` when nothing of the box is left inside the frame.
    pub fn clamp_to_frame(&self, frame_width: u32, frame_height: u32) -> Option<PixelRegion> {
        let [x1, y1, x2, y2] = self.to_tlbr();
        let x1 = x1.floor().clamp(0.0, frame_width as f64);
        let y1 = y1.floor().clamp(0.0, frame_height as f64);
        let x2 = x2.ceil().clamp(0.0, frame_width as f64);
        let y2 = y2.ceil().clamp(0.0, frame_height as f64);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(PixelRegion {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}
