use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{Frame, RGBA_CHANNELS};
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_source::FrameSource;

/// Reads a still image, or a directory of images as a frame stream.
///
/// Directory entries are ordered by file name and every image must share
/// the size of the first one. Frames are decoded lazily and always come
/// out as RGBA, the camera layout.
pub struct ImageFrameSource {
    paths: Vec<PathBuf>,
    size: (u32, u32),
}

impl ImageFrameSource {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            size: (0, 0),
        }
    }
}

impl Default for ImageFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    if paths.is_empty() {
        return Err(format!("No image frames found in {}", dir.display()).into());
    }
    Ok(paths)
}

fn decode(
    path: &Path,
    index: usize,
    expected: (u32, u32),
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgba8();
    if img.dimensions() != expected {
        return Err(format!(
            "{} is {}x{}, expected {}x{}",
            path.display(),
            img.width(),
            img.height(),
            expected.0,
            expected.1
        )
        .into());
    }
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, RGBA_CHANNELS, index))
}

impl FrameSource for ImageFrameSource {
    fn open(&mut self, path: &Path) -> Result<StreamMetadata, Box<dyn std::error::Error>> {
        let paths = if path.is_dir() {
            list_frames(path)?
        } else {
            vec![path.to_path_buf()]
        };
        let size = image::image_dimensions(&paths[0])?;
        log::debug!("Opened {} frame(s) from {}", paths.len(), path.display());

        let metadata = StreamMetadata {
            width: size.0,
            height: size.1,
            fps: 0.0,
            total_frames: paths.len(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = paths;
        self.size = size;
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        if self.paths.is_empty() {
            return Box::new(std::iter::once(Err("ImageFrameSource: not opened".into())));
        }
        let size = self.size;
        let paths = std::mem::take(&mut self.paths);
        Box::new(
            paths
                .into_iter()
                .enumerate()
                .map(move |(index, path)| decode(&path, index, size)),
        )
    }

    fn close(&mut self) {
        self.paths.clear();
    }
}
