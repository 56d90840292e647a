mod centroid_tracker;
mod matching;
mod rect;
mod track;
mod track_state;

pub use centroid_tracker::{CentroidTracker, TrackerConfig};
pub use matching::{AssignmentResult, Detection, centroid_distance, greedy_assignment};
pub use rect::{PixelRegion, Rect};
pub use track::Track;
pub use track_state::TrackState;
