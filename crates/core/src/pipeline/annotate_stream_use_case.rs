use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session::Session;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::FrameSource;

use super::pipeline_executor::{PipelineConfig, PipelineExecutor};

/// Streams every frame of an opened source through a session into a sink.
///
/// Single use: `execute` hands the owned source and sink to the executor,
/// so a second call fails.
pub struct AnnotateStreamUseCase {
    source: Option<Box<dyn FrameSource>>,
    sink: Option<Box<dyn FrameSink>>,
    executor: Box<dyn PipelineExecutor>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl AnnotateStreamUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        executor: Box<dyn PipelineExecutor>,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source: Some(source),
            sink: Some(sink),
            executor,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Returns the number of annotated frames written.
    pub fn execute(
        &mut self,
        session: &Session,
        metadata: &StreamMetadata,
        output_path: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let config = PipelineConfig {
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
        };
        let written = self.executor.execute(
            self.source.take().ok_or("Pipeline already executed")?,
            self.sink.take().ok_or("Pipeline already executed")?,
            session,
            metadata,
            output_path,
            logger,
            config,
        )?;
        logger.summary();
        Ok(written)
    }
}
