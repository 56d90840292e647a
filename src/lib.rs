//! Zone-based lane violation detection on top of per-frame vehicle detections.
//!
//! Detections from an external object detector are filtered by zone, given
//! persistent identities by a nearest-centroid tracker, scored against the
//! zone class allow-lists and confirmed over several consecutive frames.
//! Confirmed violations produce one evidence snapshot per track.

pub mod error;
pub mod evidence;
pub mod pipeline;
pub mod tracker;
pub mod violation;
pub mod zone;

pub use error::{Error, Result};
pub use evidence::{DiskSnapshotStore, EvidenceSnapshot, FrameRetentionBuffer, SnapshotStore};
pub use pipeline::{
    DetectionBuilder, DetectionSource, FrameResult, IntoDetections, PipelineConfig, RunStatistics,
    ViolationPipeline, confirmation_threshold,
};
pub use tracker::{CentroidTracker, Detection, Rect, Track, TrackState, TrackerConfig};
pub use violation::{LaneBoundary, TrackKey, ViolationEngine, ViolationRecord, ViolationStatus};
pub use zone::{Zone, ZoneDefinition, ZoneStore};
