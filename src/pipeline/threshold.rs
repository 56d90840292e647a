/// Consecutive violating frames needed for confirmation when every
/// `frame_interval`-th frame is processed.
///
/// Sparser sampling covers more wall-clock time per processed frame, so the
/// requirement steps down: intervals up to 2 use `base`, 3 to 5 use 2, and
/// anything sparser confirms on the first observation.
pub fn confirmation_threshold(frame_interval: u64, base: u32) -> u32 {
    match frame_interval {
        0..=2 => base,
        3..=5 => 2,
        _ => 1,
    }
}
