use std::path::PathBuf;

/// Describes a frame stream before any frame is read.
///
/// A still image is a one-frame stream with `fps = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

impl StreamMetadata {
    pub fn is_still_image(&self) -> bool {
        self.total_frames == 1
    }
}
