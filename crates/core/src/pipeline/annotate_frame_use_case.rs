use std::time::Instant;

use crate::detection::domain::eye_detector::EyeDetector;
use crate::detection::domain::region_selector::select_top_k;
use crate::filtering::domain::frame_filter::{FrameFilter, RegionMarker};
use crate::filtering::infrastructure::laplacian_filter::LaplacianFilter;
use crate::filtering::infrastructure::outline_marker::OutlineMarker;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::annotator_config::AnnotatorConfig;
use crate::shared::frame::Frame;

/// Per-frame stage: detect → keep the K largest → outline → high-pass.
///
/// The detector is passed per call. With no detector the frame is only
/// filtered. A failing detector is logged and treated as no detections.
pub struct FrameAnnotator {
    top_k: usize,
    marker: Box<dyn RegionMarker>,
    filter: Box<dyn FrameFilter>,
}

impl FrameAnnotator {
    pub fn new(top_k: usize, marker: Box<dyn RegionMarker>, filter: Box<dyn FrameFilter>) -> Self {
        Self {
            top_k,
            marker,
            filter,
        }
    }

    pub fn from_config(config: &AnnotatorConfig) -> Self {
        Self::new(
            config.top_k,
            Box::new(OutlineMarker::new(config.marker_value)),
            Box::new(LaplacianFilter::from_config(&config.highpass)),
        )
    }

    pub fn annotate(&self, frame: Frame, detector: Option<&dyn EyeDetector>) -> Frame {
        self.annotate_logged(frame, detector, &mut NullPipelineLogger)
    }

    /// [`Self::annotate`], reporting stage timings and the outlined count.
    pub fn annotate_logged(
        &self,
        mut frame: Frame,
        detector: Option<&dyn EyeDetector>,
        logger: &mut dyn PipelineLogger,
    ) -> Frame {
        if let Some(detector) = detector {
            let start = Instant::now();
            let detected = detector.detect(&frame);
            logger.timing("detect", start.elapsed().as_secs_f64() * 1000.0);

            match detected {
                Ok(regions) => {
                    let selected = select_top_k(&regions, self.top_k);
                    log::debug!(
                        "Frame {}: {} eye candidate(s), outlining {}",
                        frame.index(),
                        regions.len(),
                        selected.len()
                    );
                    logger.metric("regions", selected.len() as f64);
                    self.marker.mark(&mut frame, &selected);
                }
                Err(e) => log::warn!("Eye detection failed on frame {}: {e}", frame.index()),
            }
        }

        let start = Instant::now();
        let filtered = self.filter.apply(frame);
        logger.timing("highpass", start.elapsed().as_secs_f64() * 1000.0);
        filtered
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::from_config(&AnnotatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::eye_detector::DetectError;
    use crate::shared::region::Region;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubDetector {
        regions: Vec<Region>,
    }

    impl EyeDetector for StubDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<Region>, DetectError> {
            Ok(self.regions.clone())
        }
    }

    struct FailingDetector;

    impl EyeDetector for FailingDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<Region>, DetectError> {
            Err("cascade exploded".into())
        }
    }

    struct RecordingMarker {
        calls: Arc<Mutex<Vec<Vec<Region>>>>,
    }

    impl RegionMarker for RecordingMarker {
        fn mark(&self, _frame: &mut Frame, regions: &[Region]) {
            self.calls.lock().unwrap().push(regions.to_vec());
        }
    }

    struct IdentityFilter;

    impl FrameFilter for IdentityFilter {
        fn apply(&self, frame: Frame) -> Frame {
            frame
        }
    }

    // --- Helpers ---

    fn textured_frame() -> Frame {
        let data: Vec<u8> = (0..16 * 12 * 4).map(|i| (i * 31 % 251) as u8).collect();
        Frame::new(data, 16, 12, 4, 7)
    }

    fn recording_annotator() -> (FrameAnnotator, Arc<Mutex<Vec<Vec<Region>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let marker = RecordingMarker {
            calls: calls.clone(),
        };
        (
            FrameAnnotator::new(2, Box::new(marker), Box::new(IdentityFilter)),
            calls,
        )
    }

    // --- Tests ---

    #[test]
    fn test_without_detector_equals_highpass() {
        let frame = textured_frame();
        let expected = LaplacianFilter::default().apply(frame.clone());
        let out = FrameAnnotator::default().annotate(frame, None);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_no_detections_equals_highpass() {
        let frame = textured_frame();
        let expected = LaplacianFilter::default().apply(frame.clone());
        let detector = StubDetector { regions: vec![] };
        let out = FrameAnnotator::default().annotate(frame, Some(&detector));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_marks_two_largest() {
        let (annotator, calls) = recording_annotator();
        let detector = StubDetector {
            regions: vec![
                Region::new(10, 10, 50, 50),
                Region::new(5, 5, 100, 100),
                Region::new(0, 0, 20, 20),
            ],
        };
        annotator.annotate(textured_frame(), Some(&detector));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![vec![Region::new(5, 5, 100, 100), Region::new(10, 10, 50, 50)]]
        );
    }

    #[test]
    fn test_detector_failure_skips_overlay() {
        let (annotator, calls) = recording_annotator();
        let frame = textured_frame();
        let out = annotator.annotate(frame.clone(), Some(&FailingDetector));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(out, frame);
    }

    #[test]
    fn test_overlay_drawn_before_highpass() {
        // A marker on a flat frame leaves edges that survive the filter.
        let flat = Frame::filled(20, 20, 100, 0);
        let detector = StubDetector {
            regions: vec![Region::new(5, 5, 8, 8)],
        };
        let annotator = FrameAnnotator::default();
        let plain = annotator.annotate(flat.clone(), None);
        let marked = annotator.annotate(flat, Some(&detector));
        assert!(plain.data().chunks_exact(4).all(|px| px[..3] == [0, 0, 0]));
        assert!(marked.data().chunks_exact(4).any(|px| px[0] > 0));
    }

    #[test]
    fn test_alpha_follows_color_channels() {
        let flat = Frame::filled(20, 20, 255, 0);
        let detector = StubDetector {
            regions: vec![Region::new(5, 5, 8, 8)],
        };
        let out = FrameAnnotator::default().annotate(flat, Some(&detector));
        let px = out.as_ndarray();

        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(px[[y, x, 3]], px[[y, x, 0]], "pixel ({x}, {y})");
            }
        }
        // Left edge of the outline turns into a bright, opaque line.
        assert_eq!(px.slice(ndarray::s![6, 5, ..]).to_vec(), vec![255; 4]);
        assert_eq!(px.slice(ndarray::s![0, 0, ..]).to_vec(), vec![0; 4]);
    }

    #[test]
    fn test_output_keeps_size_index_and_rgba() {
        let gray = Frame::new(vec![40; 9 * 5], 9, 5, 1, 3);
        let out = FrameAnnotator::default().annotate(gray, None);
        assert_eq!((out.width(), out.height(), out.channels(), out.index()), (9, 5, 4, 3));
    }

    #[test]
    fn test_logged_variant_reports_stages() {
        use crate::pipeline::pipeline_logger::StdoutPipelineLogger;

        let detector = StubDetector {
            regions: vec![Region::new(1, 1, 3, 3)],
        };
        let mut logger = StdoutPipelineLogger::new();
        FrameAnnotator::default().annotate_logged(textured_frame(), Some(&detector), &mut logger);
        assert_eq!(logger.timings_for("detect").unwrap().count, 1);
        assert_eq!(logger.timings_for("highpass").unwrap().count, 1);
        assert_eq!(logger.metrics_for("regions").unwrap().total, 1.0);
    }
}
