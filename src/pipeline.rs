//! Pipeline module connecting an external detector with tracking, violation
//! checks and evidence capture.
//!
//! The detector is plugged in through [`DetectionSource`]; everything after
//! detection runs inside [`ViolationPipeline`].

mod builder;
mod config;
mod detector;
mod orchestrator;
mod stats;
mod threshold;

pub use builder::DetectionBuilder;
pub use config::{EvaluationMode, IdentitySource, PipelineConfig};
pub use detector::{DetectionSource, IntoDetections};
pub use orchestrator::{FrameResult, TrackedDetection, ViolationPipeline};
pub use stats::RunStatistics;
pub use threshold::confirmation_threshold;
