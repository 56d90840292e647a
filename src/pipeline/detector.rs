//! Trait for the external object detector.

use std::fmt::Display;

use crate::evidence::Frame;
use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any vehicle detection model to the
/// violation pipeline. Detections may come back in any order.
///
/// # Example
///
/// ```ignore
/// use lane_violation_rs::{DetectionSource, Detection};
/// use lane_violation_rs::evidence::Frame;
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame, frame_index: u64) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures. Failures are logged and the frame
    /// is skipped, so the error only needs to be printable.
    type Error: Display;

    /// Run inference on one frame and return its detections.
    fn detect(&mut self, frame: &Frame, frame_index: u64) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}
