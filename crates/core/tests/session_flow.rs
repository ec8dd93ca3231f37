use std::path::Path;
use std::time::Duration;

use eyecam_core::filtering::domain::frame_filter::{FrameFilter, RegionMarker};
use eyecam_core::filtering::infrastructure::laplacian_filter::LaplacianFilter;
use eyecam_core::filtering::infrastructure::outline_marker::OutlineMarker;
use eyecam_core::pipeline::annotate_stream_use_case::AnnotateStreamUseCase;
use eyecam_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use eyecam_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use eyecam_core::pipeline::session::{LoaderStatus, Session};
use eyecam_core::shared::annotator_config::{AnnotatorConfig, DetectionConfig};
use eyecam_core::shared::frame::Frame;
use eyecam_core::shared::region::Region;
use eyecam_core::video::domain::frame_source::FrameSource;
use eyecam_core::video::infrastructure::image_frame_sink::ImageFrameSink;
use eyecam_core::video::infrastructure::image_frame_source::ImageFrameSource;
use tempfile::TempDir;

const SQUARE_CASCADE: &[u8] = include_bytes!("fixtures/square_cascade.xml");

fn square_frame(index: usize) -> Frame {
    let mut frame = Frame::filled(32, 32, 0, index);
    let mut pixels = frame.as_ndarray_mut();
    for row in 12..16 {
        for col in 12..16 {
            for c in 0..4 {
                pixels[[row, col, c]] = 255;
            }
        }
    }
    frame
}

fn native_scale_config() -> AnnotatorConfig {
    AnnotatorConfig {
        detection: DetectionConfig {
            min_neighbors: 0,
            max_size: Some(8),
            ..DetectionConfig::default()
        },
        ..AnnotatorConfig::default()
    }
}

fn expected_annotation(frame: Frame, regions: &[Region]) -> Frame {
    let mut marked = frame;
    OutlineMarker::default().mark(&mut marked, regions);
    LaplacianFilter::default().apply(marked)
}

fn ready_session(storage: &Path) -> Session {
    let mut session = Session::start(native_scale_config(), SQUARE_CASCADE.to_vec(), storage);
    assert_eq!(
        session.wait_for_detector(Duration::from_secs(10)),
        LoaderStatus::Ready
    );
    session
}

#[test]
fn test_loaded_session_outlines_detected_eye() {
    let storage = TempDir::new().unwrap();
    let session = ready_session(storage.path());

    let out = session.annotate(square_frame(0));
    assert_eq!(
        out,
        expected_annotation(square_frame(0), &[Region::new(10, 10, 8, 8)])
    );
    assert_ne!(out, LaplacianFilter::default().apply(square_frame(0)));
}

#[test]
fn test_session_without_detector_only_filters() {
    let session = Session::without_detector(native_scale_config());
    let out = session.annotate(square_frame(0));
    assert_eq!(out, expected_annotation(square_frame(0), &[]));
}

#[test]
fn test_image_directory_round_trip() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    for i in 0..3 {
        let frame = square_frame(i);
        image::RgbaImage::from_raw(32, 32, frame.into_data())
            .unwrap()
            .save(input.path().join(format!("cam_{i:02}.png")))
            .unwrap();
    }

    let session = ready_session(storage.path());
    let mut source: Box<dyn FrameSource> = Box::new(ImageFrameSource::new());
    let metadata = source.open(input.path()).unwrap();
    assert_eq!(metadata.total_frames, 3);

    let mut use_case = AnnotateStreamUseCase::new(
        source,
        Box::new(ImageFrameSink::new()),
        Box::new(ThreadedPipelineExecutor::new()),
        None,
        None,
    );
    let mut logger = StdoutPipelineLogger::new().with_frame_size(32, 32);
    let written = use_case
        .execute(&session, &metadata, output.path(), &mut logger)
        .unwrap();
    assert_eq!(written, 3);
    let regions = logger.metrics_for("regions").unwrap();
    assert_eq!(regions.count, 3);
    assert_eq!(regions.total, 3.0);

    let expected = expected_annotation(square_frame(0), &[Region::new(10, 10, 8, 8)]);
    for i in 0..3 {
        let path = output.path().join(format!("frame_{i:06}.png"));
        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.as_raw(), expected.data(), "{}", path.display());
    }
    session.close();
}
