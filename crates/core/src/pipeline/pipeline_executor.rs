use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session::Session;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::FrameSource;

/// Per-run knobs shared by every executor.
pub struct PipelineConfig {
    /// Called after each written frame with `(processed, total)`.
    /// Returning `false` stops the run.
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Arc<AtomicBool>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// How the source → annotate → sink stream is driven.
///
/// Annotation always runs on the calling thread, one frame at a time, in
/// arrival order. Implementations decide where I/O happens.
pub trait PipelineExecutor: Send {
    /// Returns the number of frames written.
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        session: &Session,
        metadata: &StreamMetadata,
        output_path: &Path,
        logger: &mut dyn PipelineLogger,
        config: PipelineConfig,
    ) -> Result<usize, Box<dyn std::error::Error>>;
}
