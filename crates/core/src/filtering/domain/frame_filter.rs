use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for whole-frame filters.
///
/// Filters take the frame by value and hand back the result, which may use
/// a different channel layout than the input.
pub trait FrameFilter: Send + Sync {
    fn apply(&self, frame: Frame) -> Frame;
}

/// Domain interface for drawing detection markers into a frame in place.
pub trait RegionMarker: Send + Sync {
    fn mark(&self, frame: &mut Frame, regions: &[Region]);
}
