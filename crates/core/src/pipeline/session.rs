use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::detection::domain::detector_slot::DetectorSlot;
use crate::detection::infrastructure::detector_loader::{
    cascade_storage_dir, DetectorLoader, LoadError, LoadOutcome, LoaderGone, LoaderHandle,
};
use crate::pipeline::annotate_frame_use_case::FrameAnnotator;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::annotator_config::AnnotatorConfig;
use crate::shared::frame::Frame;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoaderStatus {
    Pending,
    Ready,
    Failed(String),
    /// Session started without a cascade; frames are only filtered.
    Disabled,
}

/// One camera session: a background cascade load plus the per-frame stage.
///
/// Frames can be annotated immediately. Until the loader publishes a
/// detector they skip detection and are only filtered. Dropping or closing
/// the session cancels the load; a detector finishing afterwards is
/// discarded.
pub struct Session {
    slot: Arc<DetectorSlot>,
    annotator: FrameAnnotator,
    cancelled: Arc<AtomicBool>,
    loader: Option<LoaderHandle>,
    status: LoaderStatus,
}

impl Session {
    /// Starts loading `resource` (cascade XML bytes) into `storage_dir`.
    pub fn start(
        config: AnnotatorConfig,
        resource: Vec<u8>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        let slot = Arc::new(DetectorSlot::new());
        let cancelled = Arc::new(AtomicBool::new(false));
        let loader = DetectorLoader::new(storage_dir, config.detection).spawn(
            resource,
            Arc::downgrade(&slot),
            cancelled.clone(),
        );
        Self {
            slot,
            annotator: FrameAnnotator::from_config(&config),
            cancelled,
            loader: Some(loader),
            status: LoaderStatus::Pending,
        }
    }

    /// [`Self::start`] with the platform data directory as storage.
    pub fn start_with_default_storage(
        config: AnnotatorConfig,
        resource: Vec<u8>,
    ) -> Result<Self, LoadError> {
        Ok(Self::start(config, resource, cascade_storage_dir()?))
    }

    /// A session that never detects.
    pub fn without_detector(config: AnnotatorConfig) -> Self {
        Self {
            slot: Arc::new(DetectorSlot::new()),
            annotator: FrameAnnotator::from_config(&config),
            cancelled: Arc::new(AtomicBool::new(true)),
            loader: None,
            status: LoaderStatus::Disabled,
        }
    }

    /// Never blocks on the loader.
    pub fn annotate(&self, frame: Frame) -> Frame {
        self.annotator.annotate(frame, self.slot.get())
    }

    pub fn annotate_logged(&self, frame: Frame, logger: &mut dyn PipelineLogger) -> Frame {
        self.annotator.annotate_logged(frame, self.slot.get(), logger)
    }

    pub fn detector_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// Non-blocking poll of the background load.
    pub fn loader_status(&mut self) -> LoaderStatus {
        if self.status == LoaderStatus::Pending {
            let polled = self.loader.as_ref().and_then(LoaderHandle::try_result);
            self.settle(polled);
        }
        self.status.clone()
    }

    /// Blocks the calling (host) thread until the load settles or `timeout`
    /// passes. Not meant for the frame path.
    pub fn wait_for_detector(&mut self, timeout: Duration) -> LoaderStatus {
        if self.status == LoaderStatus::Pending {
            let polled = self.loader.as_ref().and_then(|h| h.wait(timeout));
            self.settle(polled);
        }
        self.status.clone()
    }

    /// Ends the session. Equivalent to dropping it.
    pub fn close(self) {}

    fn settle(&mut self, polled: Option<Result<LoadOutcome, LoaderGone>>) {
        self.status = match polled {
            None => return,
            Some(Ok(LoadOutcome::Published)) => LoaderStatus::Ready,
            Some(Ok(LoadOutcome::Discarded)) => {
                LoaderStatus::Failed("detector discarded after the session closed".into())
            }
            Some(Err(e)) => LoaderStatus::Failed(e.to_string()),
        };
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if self.loader.is_some() && !self.slot.is_ready() {
            log::debug!("Session closed while the cascade was still loading");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::domain::frame_filter::FrameFilter;
    use crate::filtering::infrastructure::laplacian_filter::LaplacianFilter;
    use tempfile::TempDir;

    const SQUARE_CASCADE: &[u8] = include_bytes!("../../tests/fixtures/square_cascade.xml");

    fn frame() -> Frame {
        let data: Vec<u8> = (0..12 * 10 * 4).map(|i| (i * 13 % 256) as u8).collect();
        Frame::new(data, 12, 10, 4, 0)
    }

    #[test]
    fn test_valid_resource_becomes_ready() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::start(
            AnnotatorConfig::default(),
            SQUARE_CASCADE.to_vec(),
            tmp.path(),
        );
        assert_eq!(
            session.wait_for_detector(Duration::from_secs(10)),
            LoaderStatus::Ready
        );
        assert!(session.detector_ready());
        assert_eq!(session.loader_status(), LoaderStatus::Ready);
        assert!(tmp.path().join("haarcascade_eye.xml").exists());
    }

    #[test]
    fn test_bad_resource_fails_and_still_filters() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::start(AnnotatorConfig::default(), b"garbage".to_vec(), tmp.path());
        let status = session.wait_for_detector(Duration::from_secs(10));
        assert!(matches!(status, LoaderStatus::Failed(_)));
        assert!(!session.detector_ready());

        let f = frame();
        assert_eq!(session.annotate(f.clone()), LaplacianFilter::default().apply(f));
    }

    #[test]
    fn test_invalid_scale_factor_fails_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = AnnotatorConfig::default();
        config.detection.scale_factor = 1.0;
        let mut session = Session::start(config, SQUARE_CASCADE.to_vec(), tmp.path());

        let status = session.wait_for_detector(Duration::from_secs(10));
        let LoaderStatus::Failed(reason) = status else {
            panic!("expected failure, got {status:?}");
        };
        assert!(reason.contains("scale_factor"), "{reason}");
        assert!(!session.detector_ready());
    }

    #[test]
    fn test_failure_status_is_sticky() {
        let tmp = TempDir::new().unwrap();
        let mut session = Session::start(AnnotatorConfig::default(), b"garbage".to_vec(), tmp.path());
        let first = session.wait_for_detector(Duration::from_secs(10));
        assert_eq!(session.loader_status(), first);
    }

    #[test]
    fn test_without_detector_is_disabled() {
        let mut session = Session::without_detector(AnnotatorConfig::default());
        assert_eq!(session.loader_status(), LoaderStatus::Disabled);
        assert_eq!(
            session.wait_for_detector(Duration::from_millis(1)),
            LoaderStatus::Disabled
        );
        let f = frame();
        assert_eq!(session.annotate(f.clone()), LaplacianFilter::default().apply(f));
    }

    #[test]
    fn test_close_sets_cancel_flag() {
        let tmp = TempDir::new().unwrap();
        let session = Session::start(AnnotatorConfig::default(), SQUARE_CASCADE.to_vec(), tmp.path());
        let cancelled = session.cancelled.clone();
        session.close();
        assert!(cancelled.load(Ordering::Acquire));
    }
}
