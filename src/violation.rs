mod engine;
mod lane;
mod record;

pub use engine::{ViolationEngine, ViolationStatus};
pub use lane::{LaneBoundary, LaneSmoother, lane_violation_score};
pub use record::{TrackKey, ViolationRecord};
