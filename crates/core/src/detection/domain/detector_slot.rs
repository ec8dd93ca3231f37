use std::sync::{Arc, OnceLock};

use super::eye_detector::EyeDetector;

/// One-way availability cell for the session's detector.
///
/// Starts absent and becomes present at most once. Readers never block
/// and never observe a partially constructed detector.
#[derive(Default)]
pub struct DetectorSlot {
    detector: OnceLock<Arc<dyn EyeDetector>>,
}

impl DetectorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the detector. Returns `false` if one was already published,
    /// in which case the argument is dropped and the first detector stays.
    pub fn publish(&self, detector: Arc<dyn EyeDetector>) -> bool {
        self.detector.set(detector).is_ok()
    }

    pub fn get(&self) -> Option<&dyn EyeDetector> {
        self.detector.get().map(|d| d.as_ref())
    }

    pub fn is_ready(&self) -> bool {
        self.detector.get().is_some()
    }
}

impl std::fmt::Debug for DetectorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}
