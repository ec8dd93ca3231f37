use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, TryRecvError};
use thiserror::Error;

use crate::detection::domain::detector_slot::DetectorSlot;
use crate::shared::annotator_config::{ConfigError, DetectionConfig};
use crate::shared::constants::{APP_DIR_NAME, CASCADE_DIR_NAME, CASCADE_MODEL_NAME};

use super::cascade_detector::HaarCascadeDetector;
use super::haar_cascade::CascadeError;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read cascade resource {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine data directory")]
    NoDataDir,
    #[error("failed to create cascade directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write cascade to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build detector: {0}")]
    Parse(#[from] CascadeError),
    #[error("invalid detection settings: {0}")]
    Config(#[from] ConfigError),
}

/// What happened to a successfully loaded detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Published,
    /// The session was torn down first; the detector was dropped.
    Discarded,
}

/// Platform-specific private storage for the materialised cascade.
///
/// - macOS: `~/Library/Application Support/EyeCam/cascade/`
/// - Linux: `$XDG_DATA_HOME/EyeCam/cascade/` or `~/.local/share/EyeCam/cascade/`
/// - Windows: `%APPDATA%/EyeCam/cascade/`
pub fn cascade_storage_dir() -> Result<PathBuf, LoadError> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME).join(CASCADE_DIR_NAME))
        .ok_or(LoadError::NoDataDir)
}

/// Reads a bundled cascade shipped as a file next to the host binary.
pub fn read_resource(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Turns bundled cascade bytes into a ready detector.
///
/// The bytes are first written to private storage and the detector is
/// built from that file, mirroring how file-bound classifiers are
/// constructed.
#[derive(Debug, Clone)]
pub struct DetectorLoader {
    storage_dir: PathBuf,
    config: DetectionConfig,
}

impl DetectorLoader {
    pub fn new(storage_dir: impl Into<PathBuf>, config: DetectionConfig) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            config,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.storage_dir.join(CASCADE_MODEL_NAME)
    }

    /// Writes `resource` to [`Self::model_path`] and parses it back.
    ///
    /// Re-running overwrites the previous copy. Detection settings are
    /// checked before anything is written.
    pub fn load(&self, resource: &[u8]) -> Result<HaarCascadeDetector, LoadError> {
        self.config.validate()?;
        fs::create_dir_all(&self.storage_dir).map_err(|e| LoadError::CreateDir {
            path: self.storage_dir.clone(),
            source: e,
        })?;
        let path = self.model_path();
        write_atomic(&path, resource)?;
        log::info!("Cascade copied to {}", path.display());

        Ok(HaarCascadeDetector::from_file(&path, self.config)?)
    }

    /// Runs [`Self::load`] on a background thread.
    ///
    /// On success the detector is published into `slot`, unless `cancelled`
    /// is set or the slot has been dropped by then. The single result is
    /// delivered through the returned handle.
    pub fn spawn(
        self,
        resource: Vec<u8>,
        slot: Weak<DetectorSlot>,
        cancelled: Arc<AtomicBool>,
    ) -> LoaderHandle {
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let thread = std::thread::spawn(move || {
            let result = self
                .load(&resource)
                .map(|detector| publish(detector, &slot, &cancelled));
            match &result {
                Ok(LoadOutcome::Published) => log::info!("Eye detector ready"),
                Ok(LoadOutcome::Discarded) => {
                    log::info!("Session closed before the cascade loaded; detector discarded")
                }
                Err(e) => log::error!("Failed to load cascade: {e}"),
            }
            let _ = result_tx.send(result);
        });
        LoaderHandle {
            result: result_rx,
            thread: Some(thread),
        }
    }
}

fn publish(
    detector: HaarCascadeDetector,
    slot: &Weak<DetectorSlot>,
    cancelled: &AtomicBool,
) -> LoadOutcome {
    if cancelled.load(Ordering::Acquire) {
        return LoadOutcome::Discarded;
    }
    let Some(slot) = slot.upgrade() else {
        return LoadOutcome::Discarded;
    };
    if slot.publish(Arc::new(detector)) {
        LoadOutcome::Published
    } else {
        LoadOutcome::Discarded
    }
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), LoadError> {
    let temp_path = dest.with_extension("part");
    let result = write_then_rename(dest, &temp_path, bytes);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(dest: &Path, temp_path: &Path, bytes: &[u8]) -> Result<(), LoadError> {
    let write_err = |e| LoadError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    };
    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    file.write_all(bytes).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| LoadError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}

/// Owner side of a spawned load.
pub struct LoaderHandle {
    result: Receiver<Result<LoadOutcome, LoadError>>,
    thread: Option<JoinHandle<()>>,
}

impl LoaderHandle {
    /// Non-blocking poll. `None` while the load is still running.
    ///
    /// The result is handed out once; later polls report the thread as gone.
    pub fn try_result(&self) -> Option<Result<LoadOutcome, LoaderGone>> {
        match self.result.try_recv() {
            Ok(result) => Some(result.map_err(LoaderGone::Failed)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(LoaderGone::Exited)),
        }
    }

    /// Blocks up to `timeout` for the result.
    pub fn wait(
        &self,
        timeout: std::time::Duration,
    ) -> Option<Result<LoadOutcome, LoaderGone>> {
        match self.result.recv_timeout(timeout) {
            Ok(result) => Some(result.map_err(LoaderGone::Failed)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Some(Err(LoaderGone::Exited))
            }
        }
    }

    /// Waits for the loader thread to finish.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Cascade loader thread panicked");
            }
        }
    }
}

/// Why a loader produced no detector.
#[derive(Error, Debug)]
pub enum LoaderGone {
    #[error(transparent)]
    Failed(LoadError),
    #[error("loader thread exited without a result")]
    Exited,
}
