use crate::filtering::domain::frame_filter::FrameFilter;
use crate::shared::annotator_config::HighPassConfig;
use crate::shared::color::to_rgba;
use crate::shared::frame::{Frame, RGBA_CHANNELS};

type Kernel = [[f32; 3]; 3];

const APERTURE_1: Kernel = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];
const APERTURE_3: Kernel = [[2.0, 0.0, 2.0], [0.0, -8.0, 0.0], [2.0, 0.0, 2.0]];

/// 3x3 Laplacian high-pass filter on 8-bit frames.
///
/// Every color channel is convolved independently with the scaled kernel,
/// `delta` is added and the result is rounded (ties to even) and saturated
/// to `u8`. Borders mirror without repeating the edge pixel
/// (`gfedcb|abcdefgh|gfedcba`). The output is always RGBA.
pub struct LaplacianFilter {
    kernel: Kernel,
    delta: f32,
    preserve_alpha: bool,
}

impl LaplacianFilter {
    /// `aperture` is 1 or 3; anything else falls back to 3.
    pub fn new(aperture: usize, scale: f32, delta: f32, preserve_alpha: bool) -> Self {
        let base = if aperture == 1 { APERTURE_1 } else { APERTURE_3 };
        Self {
            kernel: base.map(|row| row.map(|k| k * scale)),
            delta,
            preserve_alpha,
        }
    }

    pub fn from_config(config: &HighPassConfig) -> Self {
        Self::new(
            config.aperture,
            config.scale,
            config.delta,
            config.preserve_alpha,
        )
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }
}

impl Default for LaplacianFilter {
    fn default() -> Self {
        Self::from_config(&HighPassConfig::default())
    }
}

impl FrameFilter for LaplacianFilter {
    fn apply(&self, mut frame: Frame) -> Frame {
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let channels = frame.channels() as usize;
        if width == 0 || height == 0 {
            return to_rgba(frame);
        }

        let filtered = if self.preserve_alpha && channels == RGBA_CHANNELS as usize {
            3
        } else {
            channels
        };

        let src = frame.data().to_vec();
        let dst = frame.data_mut();
        for y in 0..height {
            let rows = [
                reflect_101(y as isize - 1, height),
                y,
                reflect_101(y as isize + 1, height),
            ];
            for x in 0..width {
                let cols = [
                    reflect_101(x as isize - 1, width),
                    x,
                    reflect_101(x as isize + 1, width),
                ];
                for c in 0..filtered {
                    let mut sum = self.delta;
                    for (ky, &sy) in rows.iter().enumerate() {
                        for (kx, &sx) in cols.iter().enumerate() {
                            let k = self.kernel[ky][kx];
                            if k != 0.0 {
                                sum += k * src[(sy * width + sx) * channels + c] as f32;
                            }
                        }
                    }
                    dst[(y * width + x) * channels + c] =
                        sum.round_ties_even().clamp(0.0, 255.0) as u8;
                }
            }
        }

        to_rgba(frame)
    }
}

fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mirrored = if i < 0 {
        -i
    } else if i > last {
        2 * last - i
    } else {
        i
    };
    mirrored as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn gray(width: u32, height: u32, data: Vec<u8>) -> Frame {
        Frame::new(data, width, height, 1, 0)
    }

    /// Red channel of each pixel of an RGBA output.
    fn red(frame: &Frame) -> Vec<u8> {
        frame.data().chunks_exact(4).map(|px| px[0]).collect()
    }

    #[test]
    fn test_default_kernel_is_half_scaled_aperture_3() {
        let filter = LaplacianFilter::default();
        let expected: Kernel = [[1.0, 0.0, 1.0], [0.0, -4.0, 0.0], [1.0, 0.0, 1.0]];
        for (row, exp) in filter.kernel().iter().zip(expected) {
            for (k, e) in row.iter().zip(exp) {
                assert_relative_eq!(*k, e);
            }
        }
    }

    #[test]
    fn test_uniform_frame_goes_black_on_every_channel() {
        let out = LaplacianFilter::default().apply(Frame::filled(8, 6, 180, 3));
        assert_eq!((out.width(), out.height(), out.channels()), (8, 6, 4));
        assert_eq!(out.index(), 3);
        assert!(out.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_alpha_kept_when_preserved() {
        let filter = LaplacianFilter::new(3, 0.5, 0.0, true);
        let out = filter.apply(Frame::filled(4, 4, 200, 0));
        for px in out.data().chunks_exact(4) {
            assert_eq!(px, &[0, 0, 0, 200]);
        }
    }

    #[test]
    fn test_alpha_edges_filtered_like_color() {
        // Alpha step between columns 1 and 2 of a 4x1 RGBA row.
        let mut frame = Frame::filled(4, 1, 0, 0);
        for x in 2..4 {
            frame.data_mut()[x * 4 + 3] = 100;
        }
        let out = LaplacianFilter::new(1, 1.0, 0.0, false).apply(frame);
        let alpha: Vec<u8> = out.data().chunks_exact(4).map(|px| px[3]).collect();
        assert_eq!(alpha, vec![0, 100, 0, 0]);
    }

    #[test]
    fn test_delta_offsets_output() {
        let filter = LaplacianFilter::new(3, 0.5, 10.0, true);
        let out = filter.apply(gray(3, 3, vec![50; 9]));
        assert_eq!(red(&out), vec![10; 9]);
    }

    #[test]
    fn test_aperture_3_spreads_to_diagonals() {
        let mut data = vec![0u8; 25];
        data[12] = 100; // centre of 5x5
        let out = LaplacianFilter::default().apply(gray(5, 5, data));
        let r = red(&out);
        assert_eq!(r[12], 0); // -400 saturates
        assert_eq!(r[6], 100); // diagonal (1, 1)
        assert_eq!(r[18], 100); // diagonal (3, 3)
        assert_eq!(r[7], 0); // orthogonal (2, 1)
        assert_eq!(r[11], 0); // orthogonal (1, 2)
    }

    #[test]
    fn test_aperture_1_spreads_to_orthogonals() {
        let mut data = vec![0u8; 25];
        data[12] = 100;
        let out = LaplacianFilter::new(1, 1.0, 0.0, true).apply(gray(5, 5, data));
        let r = red(&out);
        assert_eq!(r[7], 100);
        assert_eq!(r[11], 100);
        assert_eq!(r[6], 0);
    }

    #[test]
    fn test_border_mirrors_without_edge_repeat() {
        // With edge replication the ends would be 100, not 200.
        let out = LaplacianFilter::new(1, 1.0, 0.0, true).apply(gray(3, 1, vec![0, 100, 0]));
        assert_eq!(red(&out), vec![200, 0, 200]);
    }

    #[test]
    fn test_ties_round_to_even() {
        // 0.5 * (1 + 0 + 0 + 0) = 0.5 rounds to 0, 0.5 * 3 = 1.5 rounds to 2.
        let filter = LaplacianFilter::new(1, 0.5, 0.0, true);
        let out = filter.apply(gray(3, 1, vec![1, 0, 0]));
        assert_eq!(red(&out)[1], 0);
        let out = filter.apply(gray(3, 1, vec![3, 0, 0]));
        assert_eq!(red(&out)[1], 2);
    }

    #[test]
    fn test_is_deterministic() {
        let data: Vec<u8> = (0..7 * 5 * 4).map(|i| (i * 53 % 256) as u8).collect();
        let frame = Frame::new(data, 7, 5, 4, 0);
        let filter = LaplacianFilter::default();
        assert_eq!(filter.apply(frame.clone()), filter.apply(frame));
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(4)]
    fn test_output_is_rgba_with_same_size(#[case] channels: u8) {
        let frame = Frame::new(vec![90; 6 * 4 * channels as usize], 6, 4, channels, 0);
        let out = LaplacianFilter::default().apply(frame);
        assert_eq!((out.width(), out.height(), out.channels()), (6, 4, 4));
    }

    #[rstest]
    #[case(-1, 5, 1)]
    #[case(0, 5, 0)]
    #[case(4, 5, 4)]
    #[case(5, 5, 3)]
    #[case(-1, 1, 0)]
    #[case(1, 1, 0)]
    fn test_reflect_101(#[case] i: isize, #[case] len: usize, #[case] expected: usize) {
        assert_eq!(reflect_101(i, len), expected);
    }
}
