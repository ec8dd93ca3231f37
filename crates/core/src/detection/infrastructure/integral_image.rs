/// Summed-area tables of a single-channel image.
///
/// Upright tables are `(width + 1) x (height + 1)` with a zero first row
/// and column, so the sum of `[x, x+w) x [y, y+h)` is four lookups.
///
/// The tilted table follows the 45-degree convention
/// `T(X, Y) = sum { I(x, y) : y < Y, |x - X + 1| <= Y - y - 1 }`: a
/// triangle whose bottom apex is pixel `(X - 1, Y - 1)`. Columns are
/// padded by `height + 1` on both sides because triangles near the
/// left and right borders still cover image pixels further up.
pub struct IntegralImage {
    width: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
    tilted: Option<TiltedTable>,
}

struct TiltedTable {
    pad: usize,
    stride: usize,
    values: Vec<i64>,
}

impl IntegralImage {
    /// Builds the upright tables, plus the tilted one when `with_tilted`.
    pub fn new(pixels: &[u8], width: usize, height: usize, with_tilted: bool) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sq_sum = vec![0u64; stride * (height + 1)];

        for y in 0..height {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width {
                let v = pixels[y * width + x] as u64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row_sum;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        let tilted = with_tilted.then(|| TiltedTable::new(pixels, width, height));

        Self {
            width,
            sum,
            sq_sum,
            tilted,
        }
    }

    /// Sum of pixels in `[x, x+w) x [y, y+h)`. The rectangle must lie inside.
    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let stride = self.width + 1;
        let a = self.sum[y * stride + x];
        let b = self.sum[y * stride + x + w];
        let c = self.sum[(y + h) * stride + x];
        let d = self.sum[(y + h) * stride + x + w];
        d + a - b - c
    }

    pub fn rect_sq_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let stride = self.width + 1;
        let a = self.sq_sum[y * stride + x];
        let b = self.sq_sum[y * stride + x + w];
        let c = self.sq_sum[(y + h) * stride + x];
        let d = self.sq_sum[(y + h) * stride + x + w];
        d + a - b - c
    }

    /// Sum of a 45-degree rotated rectangle whose top corner is `(x, y)`,
    /// extending `w` down-right and `h` down-left.
    ///
    /// Returns 0 when the tilted table was not built.
    pub fn tilted_rect_sum(&self, x: i64, y: i64, w: i64, h: i64) -> i64 {
        let Some(t) = &self.tilted else {
            return 0;
        };
        let p0 = t.at(x, y);
        let p1 = t.at(x - h, y + h);
        let p2 = t.at(x + w, y + w);
        let p3 = t.at(x + w - h, y + w + h);
        p0 - p1 - p2 + p3
    }
}

impl TiltedTable {
    fn new(pixels: &[u8], width: usize, height: usize) -> Self {
        let pad = height + 1;
        let stride = width + 1 + 2 * pad;
        let mut table = Self {
            pad,
            stride,
            values: vec![0i64; stride * (height + 1)],
        };

        let pixel = |x: i64, y: i64| -> i64 {
            if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                0
            } else {
                pixels[y as usize * width + x as usize] as i64
            }
        };

        let min_x = -(pad as i64);
        let max_x = (width + pad) as i64;
        for big_y in 1..=height as i64 {
            for big_x in min_x..=max_x {
                let value = table.at(big_x - 1, big_y - 1) + table.at(big_x + 1, big_y - 1)
                    - table.at(big_x, big_y - 2)
                    + pixel(big_x - 1, big_y - 1)
                    + pixel(big_x - 1, big_y - 2);
                let idx = table.index(big_x, big_y);
                table.values[idx] = value;
            }
        }
        table
    }

    fn index(&self, x: i64, y: i64) -> usize {
        y as usize * self.stride + (x + self.pad as i64) as usize
    }

    fn at(&self, x: i64, y: i64) -> i64 {
        let col = x + self.pad as i64;
        let rows = (self.values.len() / self.stride) as i64;
        if y <= 0 || y >= rows || col < 0 || col >= self.stride as i64 {
            return 0;
        }
        self.values[self.index(x, y)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Vec<u8> {
        (0..width * height).map(|i| ((i * 37 + 11) % 251) as u8).collect()
    }

    fn brute_tilted(pixels: &[u8], width: usize, height: usize, big_x: i64, big_y: i64) -> i64 {
        let mut total = 0i64;
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                if y < big_y && (x - big_x + 1).abs() <= big_y - y - 1 {
                    total += pixels[y as usize * width + x as usize] as i64;
                }
            }
        }
        total
    }

    #[test]
    fn test_full_sum_matches_pixels() {
        let pixels = ramp(9, 7);
        let ii = IntegralImage::new(&pixels, 9, 7, false);
        let expected: u64 = pixels.iter().map(|&v| v as u64).sum();
        assert_eq!(ii.rect_sum(0, 0, 9, 7), expected);
    }

    #[test]
    fn test_rect_sum_matches_brute_force() {
        let (w, h) = (12, 10);
        let pixels = ramp(w, h);
        let ii = IntegralImage::new(&pixels, w, h, false);
        for (x, y, rw, rh) in [(0, 0, 1, 1), (3, 2, 4, 5), (11, 9, 1, 1), (2, 0, 10, 10)] {
            let mut expected = 0u64;
            let mut expected_sq = 0u64;
            for yy in y..y + rh {
                for xx in x..x + rw {
                    let v = pixels[yy * w + xx] as u64;
                    expected += v;
                    expected_sq += v * v;
                }
            }
            assert_eq!(ii.rect_sum(x, y, rw, rh), expected);
            assert_eq!(ii.rect_sq_sum(x, y, rw, rh), expected_sq);
        }
    }

    #[test]
    fn test_tilted_table_matches_definition() {
        let (w, h) = (8, 6);
        let pixels = ramp(w, h);
        let ii = IntegralImage::new(&pixels, w, h, true);
        let table = ii.tilted.as_ref().unwrap();
        for big_y in 0..=h as i64 {
            for big_x in -2..=(w as i64 + 2) {
                assert_eq!(
                    table.at(big_x, big_y),
                    brute_tilted(&pixels, w, h, big_x, big_y),
                    "T({big_x}, {big_y})"
                );
            }
        }
    }

    #[test]
    fn test_tilted_unit_rect_covers_two_stacked_pixels() {
        let (w, h) = (6, 6);
        let pixels = ramp(w, h);
        let ii = IntegralImage::new(&pixels, w, h, true);
        let px = |x: usize, y: usize| pixels[y * w + x] as i64;
        for y in 0..h - 1 {
            for x in 1..=w {
                assert_eq!(
                    ii.tilted_rect_sum(x as i64, y as i64, 1, 1),
                    px(x - 1, y) + px(x - 1, y + 1)
                );
            }
        }
    }

    #[test]
    fn test_tilted_absent_returns_zero() {
        let ii = IntegralImage::new(&[255; 16], 4, 4, false);
        assert_eq!(ii.tilted_rect_sum(1, 0, 2, 2), 0);
    }
}
