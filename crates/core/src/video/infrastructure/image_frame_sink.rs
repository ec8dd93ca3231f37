use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::color::to_rgba;
use crate::shared::frame::Frame;
use crate::shared::stream_metadata::StreamMetadata;
use crate::video::domain::frame_sink::FrameSink;

use super::image_frame_source::is_image_file;

enum Target {
    File(PathBuf),
    Directory(PathBuf),
}

/// Writes annotated frames as image files.
///
/// A still-image stream opened on a path with an image extension is
/// written to that path. Anything else treats the path as a directory
/// and writes `frame_NNNNNN.png` per frame index.
pub struct ImageFrameSink {
    target: Option<Target>,
}

impl ImageFrameSink {
    pub fn new() -> Self {
        Self { target: None }
    }
}

impl Default for ImageFrameSink {
    fn default() -> Self {
        Self::new()
    }
}

fn save(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    let rgba = to_rgba(frame.clone());
    let img = image::RgbaImage::from_raw(rgba.width(), rgba.height(), rgba.into_data())
        .ok_or("Failed to create image from frame data")?;

    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if is_jpeg {
        // JPEG has no alpha channel.
        image::DynamicImage::ImageRgba8(img).to_rgb8().save(path)?;
    } else {
        img.save(path)?;
    }
    Ok(())
}

impl FrameSink for ImageFrameSink {
    fn open(
        &mut self,
        path: &Path,
        metadata: &StreamMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let target = if metadata.is_still_image() && is_image_file(path) {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Target::File(path.to_path_buf())
        } else {
            fs::create_dir_all(path)?;
            Target::Directory(path.to_path_buf())
        };
        self.target = Some(target);
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let path = match &self.target {
            Some(Target::File(path)) => path.clone(),
            Some(Target::Directory(dir)) => dir.join(format!("frame_{:06}.png", frame.index())),
            None => return Err("ImageFrameSink: not opened".into()),
        };
        save(&path, frame)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.target = None;
        Ok(())
    }
}
