use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;

/// Produces the frame stream the annotator consumes.
///
/// Implementations own the decoding details; the pipeline only sees
/// [`Frame`] and [`StreamMetadata`].
pub trait FrameSource: Send {
    /// Opens the stream and describes it.
    fn open(&mut self, path: &Path) -> Result<StreamMetadata, Box<dyn std::error::Error>>;

    /// Frames in arrival order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
