use ndarray::s;

use crate::filtering::domain::frame_filter::RegionMarker;
use crate::shared::constants::DEFAULT_MARKER_VALUE;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Draws a 1-pixel unfilled rectangle around each region.
///
/// The outline runs from `(x, y)` to `(x + w - 1, y + h - 1)` inclusive and
/// is clipped to the frame. Every channel of an outline pixel, alpha
/// included, is set to the marker value.
pub struct OutlineMarker {
    value: u8,
}

impl OutlineMarker {
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

impl Default for OutlineMarker {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_VALUE)
    }
}

impl RegionMarker for OutlineMarker {
    fn mark(&self, frame: &mut Frame, regions: &[Region]) {
        let (frame_w, frame_h) = (frame.width(), frame.height());
        let (width, height) = (frame_w as i32, frame_h as i32);
        let mut pixels = frame.as_ndarray_mut();

        for r in regions {
            let Some(visible) = r.clamp_to(frame_w, frame_h) else {
                continue;
            };
            let (left, top) = (r.x, r.y);
            let (right, bottom) = (r.right() - 1, r.bottom() - 1);

            let x_span = visible.x..=visible.right() - 1;
            let y_span = visible.y..=visible.bottom() - 1;

            for y in [top, bottom] {
                if (0..height).contains(&y) {
                    for x in x_span.clone() {
                        pixels.slice_mut(s![y as usize, x as usize, ..]).fill(self.value);
                    }
                }
            }
            for x in [left, right] {
                if (0..width).contains(&x) {
                    for y in y_span.clone() {
                        pixels.slice_mut(s![y as usize, x as usize, ..]).fill(self.value);
                    }
                }
            }
        }
    }
}
