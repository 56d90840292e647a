/// Track state enumeration for the centroid tracker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Created this frame from an unmatched detection
    #[default]
    New,
    /// Matched to a detection this frame
    Tracked,
    /// Not matched this frame; aged without a position update
    Missed,
}
