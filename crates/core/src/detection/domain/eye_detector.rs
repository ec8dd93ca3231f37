use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub type DetectError = Box<dyn std::error::Error + Send + Sync>;

/// Domain interface for eye detection.
///
/// Detection is read-only (`&self`) so a single loaded detector can be
/// shared across threads once published.
pub trait EyeDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Region>, DetectError>;
}
