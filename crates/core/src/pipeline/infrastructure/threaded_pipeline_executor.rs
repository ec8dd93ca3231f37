use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session::Session;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::FrameSource;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Runs decoding and encoding on their own threads around the annotator.
///
/// Layout: `reader → caller [annotate] → writer`, joined by bounded
/// channels so a slow sink applies back-pressure to the source.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        mut sink: Box<dyn FrameSink>,
        session: &Session,
        metadata: &StreamMetadata,
        output_path: &Path,
        logger: &mut dyn PipelineLogger,
        config: PipelineConfig,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        sink.open(output_path, metadata)?;
        logger.info(&format!(
            "Annotating {} frame(s) at {}x{} into {}",
            metadata.total_frames,
            metadata.width,
            metadata.height,
            output_path.display()
        ));

        let (frame_tx, frame_rx) =
            crossbeam_channel::bounded::<Result<Frame, SendError>>(self.channel_capacity);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(self.channel_capacity);

        let reader_handle = spawn_reader(source, frame_tx, config.cancelled.clone());
        let writer_handle = spawn_writer(sink, write_rx);

        let outcome = run_annotate_loop(
            frame_rx,
            &write_tx,
            session,
            metadata.total_frames,
            logger,
            &config,
        );
        drop(write_tx);
        if outcome.is_err() {
            config.cancelled.store(true, Ordering::Relaxed);
        }

        join_threads(reader_handle, writer_handle, outcome)
    }
}

fn spawn_reader(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn FrameSource>> {
    std::thread::spawn(move || {
        for frame_result in source.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() {
                break;
            }
        }
        source
    })
}

fn spawn_writer(
    mut sink: Box<dyn FrameSink>,
    write_rx: Receiver<Frame>,
) -> JoinHandle<Result<Box<dyn FrameSink>, SendError>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            sink.write(&frame)
                .map_err(|e| -> SendError { e.to_string().into() })?;
        }
        Ok(sink)
    })
}

/// Annotates frames in arrival order on the calling thread.
fn run_annotate_loop(
    frame_rx: Receiver<Result<Frame, SendError>>,
    write_tx: &Sender<Frame>,
    session: &Session,
    total_frames: usize,
    logger: &mut dyn PipelineLogger,
    config: &PipelineConfig,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut processed = 0usize;

    for frame_result in frame_rx {
        if config.cancelled.load(Ordering::Relaxed) {
            break;
        }
        let frame =
            frame_result.map_err(|e| -> Box<dyn std::error::Error> { e.to_string().into() })?;

        let start = Instant::now();
        let annotated = session.annotate_logged(frame, logger);
        logger.timing("annotate", start.elapsed().as_secs_f64() * 1000.0);

        write_tx
            .send(annotated)
            .map_err(|_| "Writer channel closed unexpectedly")?;

        processed += 1;
        logger.progress(processed, total_frames);
        if let Some(ref callback) = config.on_progress {
            if !callback(processed, total_frames) {
                return Err("Cancelled".into());
            }
        }
    }

    Ok(processed)
}

/// Joins both I/O threads and coalesces errors.
///
/// A sink failure is reported ahead of the annotate loop's error, which in
/// that case is only the closed write channel.
fn join_threads(
    reader_handle: JoinHandle<Box<dyn FrameSource>>,
    writer_handle: JoinHandle<Result<Box<dyn FrameSink>, SendError>>,
    outcome: Result<usize, Box<dyn std::error::Error>>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut errors: Vec<String> = Vec::new();

    match writer_handle.join() {
        Ok(Ok(mut sink)) => {
            if let Err(e) = sink.close() {
                errors.push(e.to_string());
            }
        }
        Ok(Err(e)) => errors.push(e.to_string()),
        Err(_) => errors.push("Writer thread panicked".into()),
    }

    let processed = match outcome {
        Ok(processed) => processed,
        Err(e) => {
            errors.push(e.to_string());
            0
        }
    };

    // The frame receiver is gone by now, so a reader parked on a full
    // channel has already been released.
    match reader_handle.join() {
        Ok(mut source) => source.close(),
        Err(_) => errors.push("Reader thread panicked".into()),
    }

    match errors.into_iter().next() {
        Some(e) => Err(e.into()),
        None => Ok(processed),
    }
}
