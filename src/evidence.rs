mod buffer;
mod snapshot;

pub use buffer::FrameRetentionBuffer;
pub use snapshot::{
    DiskSnapshotStore, EvidenceSnapshot, SnapshotRequest, SnapshotStore, crop_region,
};

/// Raw frame type handled by the evidence layer.
pub type Frame = image::RgbImage;
