use std::path::Path;

use crate::detection::domain::eye_detector::{DetectError, EyeDetector};
use crate::shared::annotator_config::DetectionConfig;
use crate::shared::color::to_gray;
use crate::shared::constants::GROUP_EPS;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::haar_cascade::{CascadeError, HaarCascade, HaarFeature};
use super::integral_image::IntegralImage;
use super::rect_grouping::group_rectangles;

/// Windows whose normalised pixel spread is this flat are skipped.
const FLAT_WINDOW_LIMIT: f64 = 0.1;

/// Sliding-window Haar cascade detector over a scale pyramid.
///
/// The frame is converted to luma, then shrunk by successive powers of
/// `scale_factor`. At every scale the cascade window slides over the
/// shrunken image and each window that passes all stages is mapped back
/// to frame coordinates. Raw hits are merged by [`group_rectangles`].
pub struct HaarCascadeDetector {
    cascade: HaarCascade,
    config: DetectionConfig,
}

/// One level of the scale pyramid.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ScaleStep {
    factor: f64,
    window: (u32, u32),
    scaled: (u32, u32),
    stride: usize,
}

impl HaarCascadeDetector {
    pub fn new(cascade: HaarCascade, config: DetectionConfig) -> Self {
        Self { cascade, config }
    }

    pub fn from_file(path: &Path, config: DetectionConfig) -> Result<Self, CascadeError> {
        let cascade = HaarCascade::from_file(path)?;
        log::info!(
            "Loaded cascade {} ({}x{} window, {} stages)",
            path.display(),
            cascade.window_width,
            cascade.window_height,
            cascade.stages.len()
        );
        Ok(Self::new(cascade, config))
    }

    pub fn cascade(&self) -> &HaarCascade {
        &self.cascade
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Runs the cascade on a single-channel image.
    pub fn detect_multi_scale(&self, gray: &[u8], width: u32, height: u32) -> Vec<Region> {
        let with_tilted = self.cascade.has_tilted_features();
        let mut hits = Vec::new();

        for step in self.scale_steps(width, height) {
            let scaled = resize_bilinear(gray, width, height, step.scaled.0, step.scaled.1);
            let integral = IntegralImage::new(
                &scaled,
                step.scaled.0 as usize,
                step.scaled.1 as usize,
                with_tilted,
            );
            let max_x = (step.scaled.0 - self.cascade.window_width) as usize;
            let max_y = (step.scaled.1 - self.cascade.window_height) as usize;

            for y in (0..=max_y).step_by(step.stride) {
                for x in (0..=max_x).step_by(step.stride) {
                    if self.window_passes(&integral, x, y) {
                        hits.push(Region::new(
                            (x as f64 * step.factor).round() as i32,
                            (y as f64 * step.factor).round() as i32,
                            step.window.0 as i32,
                            step.window.1 as i32,
                        ));
                    }
                }
            }
        }

        let grouped = group_rectangles(&hits, self.config.min_neighbors, GROUP_EPS);
        log::debug!(
            "Cascade scan on {}x{}: {} raw hits, {} after grouping",
            width,
            height,
            hits.len(),
            grouped.len()
        );
        grouped
    }

    fn scale_steps(&self, width: u32, height: u32) -> Vec<ScaleStep> {
        let (win_w, win_h) = (self.cascade.window_width, self.cascade.window_height);
        let max_size = self.config.max_size;
        let min_size = self.config.min_size;
        let mut steps = Vec::new();

        let mut factor = 1.0f64;
        loop {
            let window = (
                (win_w as f64 * factor).round() as u32,
                (win_h as f64 * factor).round() as u32,
            );
            let scaled = (
                (width as f64 / factor).round() as u32,
                (height as f64 / factor).round() as u32,
            );
            if scaled.0 <= win_w || scaled.1 <= win_h {
                break;
            }
            let too_big = match max_size {
                Some(max) => window.0 > max || window.1 > max,
                None => window.0 > width || window.1 > height,
            };
            if too_big {
                break;
            }
            if window.0 >= min_size && window.1 >= min_size {
                steps.push(ScaleStep {
                    factor,
                    window,
                    scaled,
                    stride: if factor > 2.0 { 1 } else { 2 },
                });
            }
            let next = factor * self.config.scale_factor;
            if next.is_nan() || next <= factor {
                break;
            }
            factor = next;
        }
        steps
    }

    fn window_passes(&self, integral: &IntegralImage, x: usize, y: usize) -> bool {
        let norm_w = self.cascade.window_width as usize - 2;
        let norm_h = self.cascade.window_height as usize - 2;
        let area = (norm_w * norm_h) as f64;
        let sum = integral.rect_sum(x + 1, y + 1, norm_w, norm_h) as f64;
        let sq_sum = integral.rect_sq_sum(x + 1, y + 1, norm_w, norm_h) as f64;

        let spread = area * sq_sum - sum * sum;
        if spread <= 0.0 {
            return false;
        }
        let norm = spread.sqrt();
        if area / norm >= FLAT_WINDOW_LIMIT {
            return false;
        }

        self.cascade.stages.iter().all(|stage| {
            let total: f64 = stage
                .classifiers
                .iter()
                .map(|weak| {
                    weak.evaluate(|fi| {
                        feature_value(integral, &self.cascade.features[fi], x, y) / norm
                    }) as f64
                })
                .sum();
            total >= stage.threshold as f64
        })
    }
}

impl EyeDetector for HaarCascadeDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Region>, DetectError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let gray = to_gray(frame);
        Ok(self.detect_multi_scale(&gray, frame.width(), frame.height()))
    }
}

fn feature_value(integral: &IntegralImage, feature: &HaarFeature, x: usize, y: usize) -> f64 {
    feature
        .rects
        .iter()
        .map(|r| {
            let sum = if feature.tilted {
                integral.tilted_rect_sum(
                    x as i64 + r.x as i64,
                    y as i64 + r.y as i64,
                    r.width as i64,
                    r.height as i64,
                ) as f64
            } else {
                integral.rect_sum(
                    x + r.x as usize,
                    y + r.y as usize,
                    r.width as usize,
                    r.height as usize,
                ) as f64
            };
            sum * r.weight as f64
        })
        .sum()
}

/// Bilinear resize with pixel-centre alignment.
fn resize_bilinear(src: &[u8], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Vec<u8> {
    if (src_w, src_h) == (dst_w, dst_h) {
        return src.to_vec();
    }
    let (sw, sh) = (src_w as usize, src_h as usize);
    let scale_x = src_w as f64 / dst_w as f64;
    let scale_y = src_h as f64 / dst_h as f64;

    let taps = |dst: u32, scale: f64, len: usize| -> Vec<(usize, usize, f64)> {
        (0..dst)
            .map(|i| {
                let pos = ((i as f64 + 0.5) * scale - 0.5).max(0.0);
                let lo = (pos.floor() as usize).min(len - 1);
                let hi = (lo + 1).min(len - 1);
                (lo, hi, pos - lo as f64)
            })
            .collect()
    };
    let xs = taps(dst_w, scale_x, sw);
    let ys = taps(dst_h, scale_y, sh);

    let mut out = Vec::with_capacity(dst_w as usize * dst_h as usize);
    for &(y0, y1, wy) in &ys {
        for &(x0, x1, wx) in &xs {
            let p = |x: usize, y: usize| src[y * sw + x] as f64;
            let top = p(x0, y0) * (1.0 - wx) + p(x1, y0) * wx;
            let bottom = p(x0, y1) * (1.0 - wx) + p(x1, y1) * wx;
            let v = top * (1.0 - wy) + bottom * wy;
            out.push(v.round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}
